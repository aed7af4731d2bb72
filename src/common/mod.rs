pub mod errors;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_DRIVER: &'static str = "dummy";

pub const VALID_IMAGE_EXTENSIONS: &'static [&'static str] = &[
    "jpg", "jpeg", "jfif", "jpe", "png", "tif", "tiff", "webp", "bmp",
];

/// Sub-directories of a workflow folder, one per pipeline product.
pub const RAW_DIR: &'static str = "raw";
pub const DONE_DIR: &'static str = "done";
pub const OUT_DIR: &'static str = "out";

use std::sync::LazyLock;

use tokio::runtime::{Builder, Runtime};

// Rocket-specific Tokio Runtime
// This runtime is dedicated to handling network requests, with thread names clearly labeled.
// The processing worker owns its own single-threaded runtime, see `background::worker`.
pub static ROCKET_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Builder::new_multi_thread()
        .thread_name("rocket-io-worker")
        .enable_all()
        .build()
        .expect("Failed to build Rocket Tokio runtime")
});
