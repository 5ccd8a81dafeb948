use std::io::{self, BufReader, Read};

use anyhow::{Context, Result};
use tiny_wasm_decoder::{dump::write_summary, get_args, CmdConfig, Decoder};
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    let config = get_args()?;
    init_tracing(&config);

    let decoder = match config.max_size {
        Some(limit) => Decoder::new().with_size_limit(limit),
        None => Decoder::new(),
    };

    let decoded = match config.file.as_str() {
        "-" => {
            let mut reader = BufReader::new(io::stdin());

            let mut buf = vec![];
            reader.read_to_end(&mut buf)?;
            let wasm = wat::parse_bytes(&buf)?;
            decoder.decode_bytes(&wasm)
        }
        path if path.ends_with(".wat") => {
            let wasm = wat::parse_file(path)?;
            decoder.decode_bytes(&wasm)
        }
        path => decoder.open(path),
    };

    let mut out = io::stdout().lock();

    match decoded {
        Ok(module) => write_summary(&mut out, Some(&module.header), &module.sections, config.verbose)?,
        Err(err) => {
            write_summary(&mut out, err.header.as_ref(), &err.sections, config.verbose)?;
            tracing::debug!("decode failed in:\n{}", err.span_trace);
            return Err(err).with_context(|| format!("wasm-dump: {}", config.file));
        }
    }

    Ok(())
}

fn init_tracing(config: &CmdConfig) {
    let level = if config.verbose { Level::DEBUG } else { Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!config.disable_ansi_color)
        .with_writer(io::stderr)
        .finish()
        .with(ErrorLayer::default())
        .init();
}
