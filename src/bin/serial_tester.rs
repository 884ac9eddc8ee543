// src/bin/serial_tester.rs
// 测试发送端：向串口持续发送三路正弦波 (1 / 5 / 10 Hz)，按回车停止
use anyhow::{Context, Result};
use std::f64::consts::PI;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FREQUENCIES_HZ: [f64; 3] = [1.0, 5.0, 10.0];
const SAMPLES_PER_PERIOD: usize = 100;
const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// One CSV line for sample `i` of a period spanning `t = 0..=1`.
fn sine_frame(i: usize) -> String {
    let t = i as f64 / (SAMPLES_PER_PERIOD - 1) as f64;
    let fields: Vec<String> = FREQUENCIES_HZ
        .iter()
        .map(|f| format!("{:?}", (2.0 * PI * f * t).sin()))
        .collect();
    format!("{}\n", fields.join(","))
}

fn print_usage() {
    eprintln!("Usage: serial_tester <PORT> [BAUD]");
    match serialport::available_ports() {
        Ok(ports) if !ports.is_empty() => {
            eprintln!("Available ports:");
            for p in ports {
                eprintln!("  {}", p.port_name);
            }
        }
        Ok(_) => eprintln!("No serial ports found."),
        Err(e) => eprintln!("Error listing ports: {e}"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let Some(port_name) = args.next() else {
        print_usage();
        return Ok(());
    };
    let baud: u32 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid baud rate {raw:?}"))?,
        None => 9600,
    };

    let mut port = serialport::new(&port_name, baud)
        .timeout(Duration::from_secs(1))
        .open()
        .with_context(|| format!("failed to open {port_name}"))?;

    // 回车即停止
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            stop.store(true, Ordering::Relaxed);
        });
    }

    println!("Transmitting on {port_name} @ {baud}, press Enter to stop...");
    let mut sent: u64 = 0;
    'outer: loop {
        for i in 0..SAMPLES_PER_PERIOD {
            if stop.load(Ordering::Relaxed) {
                break 'outer;
            }
            port.write_all(sine_frame(i).as_bytes())
                .context("serial write failed")?;
            sent += 1;
            thread::sleep(SEND_INTERVAL);
        }
    }
    log::info!("sent {sent} lines");
    println!("Transmission stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_three_parseable_columns() {
        let frame = sine_frame(25);
        assert!(frame.ends_with('\n'));
        let values: Vec<f64> = frame
            .trim()
            .split(',')
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn period_starts_at_zero() {
        assert_eq!(sine_frame(0), "0.0,0.0,0.0\n");
    }
}
