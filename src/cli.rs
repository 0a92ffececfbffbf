use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "squeeze-zip",
    about = "Compress a batch of images and bundle them into one ZIP archive",
    long_about = "squeeze-zip re-encodes every selected image at a chosen quality, keeping its \
                  format and pixel dimensions, and packs the results into compressed_images.zip. \
                  JPEG quality is lossy; PNG, WebP, GIF, BMP and TIFF are re-encoded losslessly.",
    version,
    after_help = "EXAMPLES:\n  \
    squeeze-zip preview ./photos\n  \
    squeeze-zip bundle ./photos -q 60 -o ./out\n  \
    squeeze-zip bundle \"./shots/*.jpg\" a.png -x a.png -j 4"
)]
pub struct Args {
    #[arg(long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(long, global = true, help = "Print per-image details")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "List the images that would be bundled",
        long_about = "Read every input image and print its name, type and size, \
                      exactly as it would enter the batch."
    )]
    Preview {
        #[arg(
            required = true,
            help = "Image files, directories or glob patterns",
            long_help = "Inputs can be image files, directories or glob expressions. \
                         Examples: './images', '*.jpg', 'a.png b.png'"
        )]
        inputs: Vec<String>,

        #[arg(short = 'r', long, help = "Descend into subdirectories")]
        recursive: bool,
    },

    #[command(
        about = "Compress images and write them as a single ZIP archive",
        long_about = "Add every input image to a batch, compress all of them in parallel \
                      at the given quality, and write the compressed files into one archive."
    )]
    Bundle {
        #[arg(required = true, help = "Image files, directories or glob patterns")]
        inputs: Vec<String>,

        #[arg(
            short = 'o',
            long,
            default_value = ".",
            help = "Directory to write the archive into"
        )]
        output: PathBuf,

        #[arg(
            short = 'q',
            long,
            help = "Compression quality (1-100, default: 80)",
            long_help = "Compression quality from 1 (smallest) to 100 (best fidelity). \
                         For PNG: >=90 uses Zopfli, >=70 uses high compression, <70 uses standard compression."
        )]
        quality: Option<u8>,

        #[arg(
            short = 'j',
            long,
            help = "Number of images compressed at once (default: auto)",
            long_help = "Upper bound on parallel compressions. \
                         The actual number may be lower when images are large or memory is short."
        )]
        threads: Option<usize>,

        #[arg(short = 'r', long, help = "Descend into subdirectories")]
        recursive: bool,

        #[arg(
            short = 'x',
            long = "exclude",
            value_name = "NAME",
            help = "Drop images with this file name from the batch (repeatable)"
        )]
        exclude: Vec<String>,

        #[arg(
            short = 'n',
            long = "name",
            help = "Archive file name (default: compressed_images.zip)"
        )]
        archive_name: Option<String>,
    },
}
