use std::path::PathBuf;

pub fn output_dir() -> PathBuf {
    PathBuf::from("./out")
}

pub fn delay_ms() -> u64 {
    0
}

pub fn mode() -> super::Mode {
    super::Mode::Auto
}
