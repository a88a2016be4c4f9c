//! Terminal progress for directory sweeps and long waits.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Bar over `len` files.
pub fn bar(len: usize, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")
            .expect("valid progress template")
            .progress_chars("##-"),
    );
    pb.set_message(msg.to_string());
    pb
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid progress template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
