//! Statistics display and formatting

use srt_live::{RecvStats, SendStats};
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format bandwidth (bits per second) in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format a microsecond period in human-readable form
pub fn format_period(period_us: f64) -> String {
    if period_us >= 1_000_000.0 {
        format!("{:.2}s", period_us / 1_000_000.0)
    } else if period_us >= 1_000.0 {
        format!("{:.2}ms", period_us / 1_000.0)
    } else {
        format!("{:.2}µs", period_us)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Percentage of `part` in `whole`, 0 when `whole` is 0
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Display sender statistics
pub fn display_sender_stats(stats: &SendStats) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ SENDER                                                      │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Sent:        {} packets ({} unique) / {}",
        stats.pkt_sent,
        stats.pkt_sent_unique,
        format_bytes(stats.byte_sent)
    );
    println!(
        "│ Loss:        {} packets reported ({:.2}%)",
        stats.pkt_snd_loss,
        percent(stats.pkt_snd_loss, stats.pkt_sent_unique)
    );
    println!(
        "│ Retransmit:  {} packets / {}",
        stats.pkt_retrans,
        format_bytes(stats.byte_retrans)
    );
    println!(
        "│ Dropped:     {} packets / {}",
        stats.pkt_snd_drop,
        format_bytes(stats.byte_snd_drop)
    );
    println!(
        "│ Buffer:      {} packets / {} ({} in flight)",
        stats.pkt_snd_buf,
        format_bytes(stats.byte_snd_buf),
        stats.pkt_flight_size
    );
    println!(
        "│ Pacing:      {} per packet, avg payload {}",
        format_period(stats.us_pkt_snd_period),
        format_bytes(stats.byte_payload)
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display receiver statistics
pub fn display_receiver_stats(stats: &RecvStats) {
    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ RECEIVER                                                    │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Received:    {} packets ({} unique) / {}",
        stats.pkt_recv,
        stats.pkt_recv_unique,
        format_bytes(stats.byte_recv)
    );
    println!(
        "│ Loss:        {} packets detected / ~{}",
        stats.pkt_rcv_loss,
        format_bytes(stats.byte_rcv_loss)
    );
    println!(
        "│ Retransmit:  {} packets filled a gap",
        stats.pkt_rcv_retrans
    );
    println!(
        "│ Dropped:     {} late or duplicate / {}",
        stats.pkt_rcv_drop,
        format_bytes(stats.byte_rcv_drop)
    );
    println!(
        "│ Buffer:      {} packets / {}, avg payload {}",
        stats.pkt_rcv_buf,
        format_bytes(stats.byte_rcv_buf),
        format_bytes(stats.byte_payload)
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// One-line progress summary
pub fn compact_stats(elapsed: Duration, send: &SendStats, recv: &RecvStats) -> String {
    let throughput_bps = if elapsed.as_secs() > 0 {
        (recv.byte_recv_unique * 8) / elapsed.as_secs()
    } else {
        0
    };

    format!(
        "[{:8}] Sent: {} | Retrans: {} | Recv: {} | Lost: {} | Rate: {}",
        format_duration(elapsed),
        send.pkt_sent_unique,
        send.pkt_retrans,
        recv.pkt_recv_unique,
        recv.pkt_rcv_loss,
        format_bandwidth(throughput_bps)
    )
}
