//! ba-trace - Block Ack agreement trace driver
//!
//! Drives an originator and a recipient agreement against each other over a
//! seeded lossy link: bursts of data MPDUs, a Block Ack Request / Block Ack
//! exchange after each burst, retransmission of unacknowledged MPDUs and
//! discard at the retry limit. Every frame crossing the link goes through
//! the wire codec.

use anyhow::anyhow;
use blockack::{ChannelRecipient, MacAddress, SeqNumber};
use blockack_cli::{load_scenario, LossyLink, ScenarioConfig};
use blockack_protocol::bitmap::{BitmapLength, BlockAckReq, CompressedBlockAck};
use blockack_protocol::sequence::SeqControl;
use blockack_protocol::window::OriginatorAgreement;
use bytes::Bytes;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "ba-trace")]
#[command(about = "Block Ack protocol trace driver", long_about = None)]
struct Args {
    /// Scenario file (TOML)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Number of MPDUs to deliver (overrides the scenario)
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Frame loss probability in [0, 1] (overrides the scenario)
    #[arg(short, long)]
    loss: Option<f64>,

    /// Link seed (overrides the scenario)
    #[arg(long)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let mut config = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(count) = args.count {
        config.mpdu_count = count;
    }
    if let Some(loss) = args.loss {
        config.loss_rate = loss;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    run_trace(config)
}

fn run_trace(config: ScenarioConfig) -> anyhow::Result<()> {
    let bitmap_len = BitmapLength::from_octets(config.bitmap_octets)?;
    let originator_addr = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    let recipient_addr = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
    let start = SeqNumber::new_unchecked(config.starting_seq);

    tracing::info!(
        "Agreement established: buffer {}, start {}, bitmap {} octets",
        config.buffer_size,
        start,
        config.bitmap_octets
    );
    tracing::info!(
        "Link: loss rate {:.2}, seed {:#x}",
        config.loss_rate,
        config.seed
    );

    let mut originator = OriginatorAgreement::new(recipient_addr, 0, config.buffer_size, start)?;
    let (recipient, delivery) = ChannelRecipient::new(originator_addr, 0, config.buffer_size, start)?;

    // Upper layer: drain the delivery channel until the agreement tears down
    let consumer = thread::spawn(move || {
        let mut count = 0u64;
        let mut last = None;
        for mpdu in delivery.iter() {
            count += 1;
            last = Some(mpdu.seq);
        }
        (count, last)
    });

    let mut link = LossyLink::new(config.loss_rate, config.seed);
    let mut attempts: HashMap<u16, u32> = HashMap::new();
    let payload = Bytes::from(vec![0u8; config.payload_len]);

    let mut next_new = start;
    let mut produced = 0usize;
    let mut bursts = 0u64;

    loop {
        // Retransmissions first, then new MPDUs while the window has room
        let mut burst: Vec<SeqNumber> = originator.outstanding().collect();
        burst.truncate(config.burst_size);
        while burst.len() < config.burst_size
            && produced < config.mpdu_count
            && next_new.distance_from(originator.head_sequence()) < config.buffer_size
        {
            burst.push(next_new);
            next_new.increment();
            produced += 1;
        }

        if burst.is_empty() {
            break;
        }
        bursts += 1;

        for seq in burst {
            originator.notify_transmitted(seq);
            *attempts.entry(seq.as_raw()).or_insert(0) += 1;
            if link.passes() {
                recipient.notify_received(seq, payload.clone());
            } else {
                tracing::debug!(%seq, "Data frame lost");
            }
        }

        // Block Ack exchange: request anchored at the window head, bitmap
        // response from the recipient scoreboard
        let bar = BlockAckReq::new(SeqControl::new(originator.head_sequence(), 0));
        if link.passes() {
            let request = BlockAckReq::from_bytes(&bar.to_bytes())?;
            recipient.notify_bar_received(request.start.seq());

            let response = recipient.make_block_ack(bitmap_len);
            if link.passes() {
                let decoded = CompressedBlockAck::from_bytes(&response.to_bytes())?;
                let settled = originator.apply_block_ack(decoded.start.seq(), &decoded.bitmap);
                tracing::debug!(settled, head = %originator.head_sequence(), "Block Ack applied");
            } else {
                tracing::debug!("Block Ack lost");
            }
        } else {
            tracing::debug!("Block Ack Request lost");
        }

        // Give up on MPDUs past the retry limit
        let exhausted: Vec<SeqNumber> = originator
            .outstanding()
            .filter(|seq| attempts.get(&seq.as_raw()).copied().unwrap_or(0) >= config.retry_limit)
            .collect();
        for seq in exhausted {
            originator.notify_discarded(seq);
        }
    }

    // Final request flushes anything still buffered behind holes
    recipient.notify_bar_received(next_new);

    let recipient_stats = recipient.stats();
    drop(recipient);
    let (delivered, last) = consumer
        .join()
        .map_err(|_| anyhow!("Delivery consumer panicked"))?;

    let originator_stats = originator.stats();
    tracing::info!("Trace complete: {} bursts", bursts);
    tracing::info!(
        "Link: {} frames passed, {} dropped",
        link.frames_passed(),
        link.frames_dropped()
    );
    tracing::info!(
        "Originator: {} acked, {} discarded, {} implicitly settled",
        originator_stats.mpdus_acked,
        originator_stats.mpdus_discarded,
        originator_stats.implicitly_settled
    );
    tracing::info!(
        "Recipient: {} delivered, {} stale dropped, {} duplicates, {} holes, {} BARs",
        recipient_stats.mpdus_delivered,
        recipient_stats.stale_dropped,
        recipient_stats.duplicates_overwritten,
        recipient_stats.holes_abandoned,
        recipient_stats.bars_received
    );
    tracing::info!(
        "Upper layer: {} of {} MPDUs delivered in order, last sequence {:?}",
        delivered,
        config.mpdu_count,
        last
    );

    Ok(())
}
