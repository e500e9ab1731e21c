use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use jpgd2bmp::{
    BaselineDecoder, ConvertError, ConvertRequest, Unstoppable, WindowOverrides, create_output,
    open_input,
};

const DEFAULT_DEST: &str = "jpgd2bmp_out.bmp";

/// Converts a baseline JPEG into a bottom-up BMP one row-group at a time
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, disable_help_flag = true)]
struct CliArgs {
    /// Output height in pixels; 0 or less keeps the native height
    #[arg(short = 'h', value_name = "height", allow_negative_numbers = true)]
    height: Option<i64>,

    /// Output width in pixels; 0 or less keeps the native width
    #[arg(short = 'w', value_name = "width", allow_negative_numbers = true)]
    width: Option<i64>,

    /// Left edge of the window in the source image
    #[arg(short = 'x', value_name = "x_offset", allow_negative_numbers = true)]
    x_offset: Option<i64>,

    /// Top edge of the window in the source image
    #[arg(short = 'y', value_name = "y_offset", allow_negative_numbers = true)]
    y_offset: Option<i64>,

    /// Baseline JPEG to convert
    #[arg(value_name = "source")]
    source: PathBuf,

    /// BMP file to write
    #[arg(value_name = "dest", default_value = DEFAULT_DEST)]
    dest: PathBuf,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if matches!(e, ConvertError::UnsupportedInput(_)) {
                eprintln!("Progressive JPEG files are not supported.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), ConvertError> {
    let request = ConvertRequest::new().with_overrides(WindowOverrides {
        width: args.width,
        height: args.height,
        x_offset: args.x_offset,
        y_offset: args.y_offset,
    });

    let input = open_input(&args.source)?;
    let prepared = request.prepare(BaselineDecoder::new(), input)?;
    let storage = prepared.storage();
    println!(
        "Memory allocation: {} bytes for the decoder, {} bytes for the row-group buffer",
        storage.decoder_bytes, storage.row_group_bytes
    );

    let output = create_output(&args.dest)?;
    let report = prepared.write_to(output, Unstoppable)?;

    let window = report.descriptor.window();
    println!(
        "Width: {}, Height: {}, Comps: {}, Scan type: {}",
        window.width, window.height, report.descriptor.components, report.descriptor.scan_type
    );
    println!("Successfully wrote destination file {}", args.dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_h_is_height_not_help() {
        let args = CliArgs::try_parse_from(["jpgd2bmp", "-h", "64", "in.jpg"]).unwrap();
        assert_eq!(args.height, Some(64));
        assert_eq!(args.dest, PathBuf::from(DEFAULT_DEST));
    }

    #[test]
    fn negative_values_are_accepted() {
        let args = CliArgs::try_parse_from([
            "jpgd2bmp", "-w", "-1", "-x", "-5", "-y", "3", "in.jpg", "out.bmp",
        ])
        .unwrap();
        assert_eq!(args.width, Some(-1));
        assert_eq!(args.x_offset, Some(-5));
        assert_eq!(args.y_offset, Some(3));
        assert_eq!(args.dest, PathBuf::from("out.bmp"));
    }

    #[test]
    fn source_is_required() {
        assert!(CliArgs::try_parse_from(["jpgd2bmp", "-w", "8"]).is_err());
    }

    #[test]
    fn arguments_are_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
