use clap::{Parser, Subcommand};
use cu_mocap_bridge::config::read_ron_file;
use cu_mocap_bridge::logging::basic_bridge_setup;
use cu_mocap_bridge::publisher::{read_records, write_records};
use cu_mocap_bridge::{
    read_configuration, AssetDescription, AssetRegistry, BridgeConfig, BridgeContext,
    BridgeResult, Frame, FrameClock, FrameDispatcher, LogPublisher, MemoryPublisher,
    PublishedRecord, Publisher,
};
use log::{info, LevelFilter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

/// Runs recorded motion-capture frames through the bridge.
#[derive(Parser)]
#[command(author, version, about)]
struct ReplayCli {
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a RON list of frames
    Replay {
        /// RON asset list: [(id: 7, name: "drone1"), ...]
        assets: PathBuf,
        /// RON list of frames
        frames: PathBuf,
        /// Bridge configuration, defaults are used when absent
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write every published record to this file instead of logging it
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Capture clock reading at connection, in seconds. Frames are then stamped relative to
        /// now instead of the first frame
        #[arg(long)]
        capture_at_connection: Option<f64>,
    },
    /// Print the records of a replay output file
    Dump { records: PathBuf },
}

fn replay<P: Publisher>(
    dispatcher: &mut FrameDispatcher<P>,
    frames: &[Frame],
) -> (usize, usize) {
    let mut processed = 0;
    let mut dropped = 0;
    for frame in frames {
        match dispatcher.on_frame(frame) {
            Some(report) => {
                processed += 1;
                info!(
                    "Frame {}: {} rigid bodies, {} skipped, {} tracked markers, {} cloud points, {} publish failures",
                    report.frame_number,
                    report.rigid_bodies_published,
                    report.rigid_bodies_skipped,
                    report.markers_tracked,
                    report.cloud_points,
                    report.publish_failures
                );
            }
            None => dropped += 1,
        }
    }
    (processed, dropped)
}

fn run(command: Command) -> BridgeResult<()> {
    match command {
        Command::Replay {
            assets,
            frames,
            config,
            output,
            capture_at_connection,
        } => {
            let config = match config {
                Some(path) => read_configuration(&path)?,
                None => BridgeConfig::default(),
            };
            let assets: Vec<AssetDescription> = read_ron_file(&assets)?;
            let registry = AssetRegistry::new(assets)?;
            info!("{} assets registered", registry.len());
            let frames: Vec<Frame> = read_ron_file(&frames)?;

            // Recorded frames carry the capture clock only, anchor on the first one by default.
            let clock = match capture_at_connection {
                Some(capture) => FrameClock::connected_now(capture),
                None => FrameClock::unanchored(),
            };
            let ctx = BridgeContext::new(config, registry, clock)?;

            match output {
                Some(path) => {
                    let mut dispatcher = FrameDispatcher::new(ctx, MemoryPublisher::new());
                    let (processed, dropped) = replay(&mut dispatcher, &frames);
                    let (_, publisher) = dispatcher.into_parts();
                    let written =
                        write_records(publisher.records(), BufWriter::new(File::create(&path)?))?;
                    info!(
                        "{processed} frames processed, {dropped} dropped, {} records ({written} bytes) written to {}",
                        publisher.records().len(),
                        path.display()
                    );
                }
                None => {
                    let mut dispatcher = FrameDispatcher::new(ctx, LogPublisher::new());
                    let (processed, dropped) = replay(&mut dispatcher, &frames);
                    info!(
                        "{processed} frames processed, {dropped} dropped, {} messages published",
                        dispatcher.publisher().published()
                    );
                }
            }
        }
        Command::Dump { records } => {
            let records = read_records(BufReader::new(File::open(&records)?))?;
            for record in &records {
                match record {
                    PublishedRecord::Advertised { topic, kind } => {
                        println!("advertise {topic} [{}]", kind.ros_type())
                    }
                    PublishedRecord::Message { topic, message } => {
                        println!("{topic} @{}: {:?}", message.header().stamp, message)
                    }
                    PublishedRecord::Transform(tf) => println!(
                        "tf {} -> {} @{}",
                        tf.header.frame_id, tf.child_frame_id, tf.header.stamp
                    ),
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let args = ReplayCli::parse();
    if let Err(e) = basic_bridge_setup(args.log_level) {
        eprintln!("{e}");
    }
    if let Err(e) = run(args.command) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
