// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

use crate::models::constants::LOG_CAPACITY;
use chrono::{DateTime, Local};
use colored::*;
use lazy_static::lazy_static;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

lazy_static! {
    static ref RECENT: Mutex<VecDeque<LogEntry>> = Mutex::new(VecDeque::with_capacity(LOG_CAPACITY));
}

// While set, the TUI owns stdout and log lines only go to the ring buffer.
static CAPTURE: AtomicBool = AtomicBool::new(false);

pub fn capture_logs(enabled: bool) {
    CAPTURE.store(enabled, Ordering::SeqCst);
}

pub fn is_capturing() -> bool {
    CAPTURE.load(Ordering::SeqCst)
}

pub fn latest_log() -> Option<LogEntry> {
    RECENT.lock().ok().and_then(|recent| recent.back().cloned())
}

fn record(level: LogLevel, message: &str) {
    if let Ok(mut recent) = RECENT.lock() {
        if recent.len() == LOG_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(LogEntry {
            at: Local::now(),
            level,
            message: message.to_string(),
        });
    }
}

fn emit(level: LogLevel, message: &str, line: String) {
    record(level, message);
    if !is_capturing() {
        println!("{}", line);
    }
}

pub fn print_banner(engine: &str, targets: &[String]) {
    if is_capturing() {
        return;
    }
    println!("{}", format!(r#"
    ╔══════════════════════════════════════════════════════╗
    ║   B I O D I G E S T O R   ·   M O N I T O R          ║
    ║   red bayesiana de diagnóstico anaerobio             ║
    ╚══════════════════════════════════════════════════════╝
    ENGINE: {}
    TARGETS: {}"#, engine, targets.join(", ")).cyan());
}

pub fn log_header(title: &str) {
    if is_capturing() {
        return;
    }
    println!("\n╔═══════════════[>MONITOR<]════════════════╗");
    println!("║ [BIODIGESTOR] {} ║", title.bright_cyan().bold());
    println!("╠═══════════════[>DIAGNOSTICO<]═══════════════╣");
}

pub fn log_metric(label: &str, value: impl std::fmt::Display) {
    let value = value.to_string();
    emit(
        LogLevel::Info,
        &format!("{}: {}", label, value),
        format!("║ <{:_<24}> │ {:>35} ║", label.bright_cyan(), format!("[{}]", value).bright_white()),
    );
}

pub fn log_success(message: &str) {
    emit(LogLevel::Success, message, format!("║ [//:OK] >> {}", message.bright_cyan()));
}

pub fn log_warning(message: &str) {
    emit(LogLevel::Warning, message, format!("║ [WARN//DETECTED] >> {}", message.bright_yellow()));
}

pub fn log_error(message: &str) {
    emit(LogLevel::Error, message, format!("║ [ERR//CRITICAL] >> {}", message.bright_red()));
}

pub fn log_info(message: &str) {
    emit(
        LogLevel::Info,
        message,
        format!(
            "║ [T:{}] >> {}",
            Local::now().format("%H:%M:%S%.3f").to_string().bright_cyan(),
            message.cyan()
        ),
    );
}

pub fn log_footer() {
    if is_capturing() {
        return;
    }
    println!("╚════════════════[>STREAM.TERMINATED<]═══════════════╝\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recent_logs(count: usize) -> Vec<LogEntry> {
        let recent = RECENT.lock().unwrap();
        let skip = recent.len().saturating_sub(count);
        recent.iter().skip(skip).cloned().collect()
    }

    #[test]
    fn entries_land_in_the_ring_buffer() {
        log_warning("CPT of pHReal: unrecognized CPT format: test marker 7f3a");
        let recent = recent_logs(LOG_CAPACITY);
        let entry = recent
            .iter()
            .rev()
            .find(|e| e.message.ends_with("test marker 7f3a"))
            .unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
    }

    #[test]
    fn buffer_is_bounded() {
        for i in 0..LOG_CAPACITY + 10 {
            log_info(&format!("tick {}", i));
        }
        assert!(recent_logs(usize::MAX).len() <= LOG_CAPACITY);
        assert_eq!(recent_logs(3).len(), 3);
    }
}
