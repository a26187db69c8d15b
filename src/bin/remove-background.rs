//! Background removal command line tool
//!
//! Removes the background of images with an ONNX segmentation model using the
//! remove-background library.

#[cfg(feature = "cli")]
use remove_background::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
