use std::fs;
use std::process::ExitCode;

use charly_post::config::Config;
use charly_post::post::DialectPolicy;
use charly_post::{export, init_logging, toolpath, Error};
use tracing::info;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: charly-post <input.json> [output.nc] [options...]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --header | --no-header            (Exported by ...) header lines");
        eprintln!("  --comments | --no-comments        operation and cycle comments");
        eprintln!("  --line-numbers | --no-line-numbers");
        eprintln!("  --show-editor                     print the program before writing it");
        eprintln!("  --precision <n>                   decimals, default 3");
        eprintln!("  --metric | --inches");
        eprintln!("  --preamble <text> --postamble <text>   \\n separates lines");
        eprintln!("  --line-start <n> --line-increment <n>");
        eprintln!("  --dialect <charly|linuxcnc|policy.json>");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  charly-post job.json job.nc --no-header --precision 2");
        return ExitCode::FAILURE;
    }

    init_logging();

    let input_path = &args[1];
    let (output_path, rest) = match args.get(2) {
        Some(path) if !path.starts_with("--") => (path.as_str(), &args[3..]),
        _ => ("output.nc", &args[2..]),
    };
    let options = join_options(rest);

    match run(input_path, output_path, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Config(e)) => {
            eprint!("{}", e.report(&options));
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(input_path: &str, output_path: &str, options: &str) -> Result<(), Error> {
    let config = Config::parse(options)?;
    let policy = match &config.dialect {
        Some(dialect) => DialectPolicy::resolve(dialect)?,
        None => DialectPolicy::default(),
    };

    let nodes = toolpath::from_file(input_path)?;
    let gcode = export(&nodes, &policy, &config)?;

    if config.show_editor {
        print!("{}", gcode);
    }

    fs::write(output_path, gcode)?;
    info!(output = output_path, "generated");

    Ok(())
}

/// Back to one option string, quoting arguments the shell had split off
fn join_options(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
                format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_options_round_trips_through_config() {
        let options = join_options(&strings(&["--preamble", "G17 G90", "--precision=2"]));
        assert_eq!(options, r#"--preamble "G17 G90" --precision=2"#);
        let config = Config::parse(&options).unwrap();
        assert_eq!(config.preamble, "G17 G90");
        assert_eq!(config.precision, 2);
    }

    #[test]
    fn test_run_writes_program() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        write!(
            input,
            r#"[{{"type": "path", "label": "Face", "commands": [{{"code": "G0", "params": {{"Z": 5}}}}]}}]"#
        )
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("face.nc");

        run(
            input.path().to_str().unwrap(),
            output.to_str().unwrap(),
            "--no-header --no-line-numbers --dialect linuxcnc",
        )
        .unwrap();

        let gcode = fs::read_to_string(&output).unwrap();
        assert!(gcode.starts_with("(begin preamble)\nG21\nG90\n"));
        assert!(gcode.contains("G0 X0.000 Y0.000 Z5.000\n"));
    }

    #[test]
    fn test_run_rejects_unknown_option() {
        let err = run("missing.json", "out.nc", "--bogus").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
