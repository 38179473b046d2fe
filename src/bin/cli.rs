use anyhow::{anyhow, bail, Context, Result};
use crabcapture::{formats, CaptureSession, CrabCaptureConfig, Size};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: crabcapture-cli <command> [args]");
        eprintln!("Commands: list-devices, list-formats, capture");
        std::process::exit(1);
    }

    let config = CrabCaptureConfig::load_or_default();
    crabcapture::init_logging_with(&config.logging.level);
    if let Err(e) = config.validate() {
        bail!("invalid configuration: {}", e);
    }

    let command = &args[1];
    match command.as_str() {
        "list-devices" => cmd_list_devices(&config, &args),
        "list-formats" => cmd_list_formats(&args),
        "capture" => cmd_capture(&config, &args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_list_devices(config: &CrabCaptureConfig, args: &[String]) -> Result<()> {
    let session = CaptureSession::from_config(config)?;
    let sources = session.catalog().enumerate()?;
    if args.contains(&"--json".to_string()) {
        let rows: Vec<_> = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                serde_json::json!({
                    "index": index,
                    "name": source.name,
                    "friendly_name": session.catalog().friendly_name(source),
                    "kind": source.kind,
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&rows)?);
    } else {
        for (index, source) in sources.iter().enumerate() {
            println!("{}: {}", index, session.catalog().friendly_name(source));
        }
    }
    Ok(())
}

fn cmd_list_formats(args: &[String]) -> Result<()> {
    if args.contains(&"--json".to_string()) {
        let rows: Vec<_> = formats::entries()
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "label": entry.label,
                    "guid": entry.platform.to_string(),
                    "decoder_format": entry.decoder.name(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&rows)?);
    } else {
        for entry in formats::entries() {
            println!("{:<7} {} -> {}", entry.label, entry.platform, entry.decoder);
        }
    }
    Ok(())
}

fn cmd_capture(config: &CrabCaptureConfig, args: &[String]) -> Result<()> {
    // capture <name> <label|guid> <W>x<H> [--frames <n>] [--out <file>] [--json]
    let mut positional = Vec::new();
    let mut frames: u64 = 1;
    let mut out_path = None;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--frames needs a value"))?;
                frames = value.parse().context("--frames")?;
            }
            "--out" => {
                i += 1;
                out_path = Some(args.get(i).ok_or_else(|| anyhow!("--out needs a path"))?.clone());
            }
            "--json" => json = true,
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [name, format, size] = positional.as_slice() else {
        eprintln!("Usage: crabcapture-cli capture <name> <format> <W>x<H> [--frames <n>] [--out <file>] [--json]");
        std::process::exit(1);
    };
    let platform_format = formats::parse_platform_format(format)?;
    let size: Size = size.parse()?;

    let running = Arc::new(AtomicBool::new(true));
    if frames == 0 {
        let flag = Arc::clone(&running);
        ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }

    let mut out = match &out_path {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path))?,
        )),
        None => None,
    };

    let mut session = CaptureSession::from_config(config)?;
    session.open(name)?;
    session.start_capture(&platform_format, size.width, size.height)?;
    if let Some(negotiation) = session.negotiation() {
        if !json {
            println!(
                "Capturing {} as {} {}{}",
                name,
                negotiation.output_size,
                negotiation.output_format,
                if negotiation.scaled { " (scaled)" } else { "" }
            );
        }
    }

    let mut captured = 0u64;
    while running.load(Ordering::SeqCst) && (frames == 0 || captured < frames) {
        let Some(frame) = session.read_frame()? else {
            if json {
                println!("null");
            } else {
                println!("No more frames");
            }
            break;
        };
        if let Some(out) = out.as_mut() {
            out.write_all(frame)?;
        }
        if json {
            println!(
                "{}",
                serde_json::json!({ "index": captured, "bytes": frame.len() })
            );
        } else {
            println!("Frame {}: {} bytes", captured, frame.len());
        }
        captured += 1;
    }

    if let Some(mut out) = out {
        out.flush()?;
    }
    session.close();
    Ok(())
}
