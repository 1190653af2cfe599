use crate::config::{load_config, Config};
use crate::ir::parse_graph_spec;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_text};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "lgl", version, about = "Layered graph layout from a JSON/JSON5 topology")]
pub struct Args {
    /// Topology file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG, JSON and DOT.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout settings and themeVariables)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Relaxation passes; overrides the config file
    #[arg(short = 'p', long = "passes")]
    pub passes: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
    Dot,
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    if let Some(passes) = args.passes {
        config.options.detangle_passes = passes;
    }

    let input = read_input(args.input.as_deref())?;
    render_document(&input, &config, args.output_format, args.output.as_deref())
}

/// Lay out one topology document and write it in `format`.
pub fn render_document(
    input: &str,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let spec = parse_graph_spec(input)?;
    let mut diagram = spec.build(config)?;
    info!(
        nodes = diagram.graph.node_count(),
        edges = diagram.graph.edge_count(),
        passes = config.options.detangle_passes,
        "laying out graph"
    );
    for checkpoint in diagram.graph.update_layout_iter(config.options) {
        debug!(%checkpoint, "checkpoint");
    }

    match format {
        OutputFormat::Svg => {
            let svg = render_svg(&diagram, &config.theme, &config.sizing);
            write_output_text(&svg, output)?;
        }
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            let svg = render_svg(&diagram, &config.theme, &config.sizing);
            write_output_png(&svg, output, &config.render, &config.theme)?;
        }
        OutputFormat::Json => write_layout_dump(output, &diagram)?,
        OutputFormat::Dot => write_output_text(&diagram.graph.to_dot(), output)?,
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded in another binary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = Args::parse_from(["lgl", "-i", "g.json5", "-e", "dot", "-p", "3"]);
        assert_eq!(args.input, Some(PathBuf::from("g.json5")));
        assert_eq!(args.output_format, OutputFormat::Dot);
        assert_eq!(args.passes, Some(3));
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(None, "png").is_err());
    }

    #[test]
    fn writes_dot_to_a_file() {
        let dir = std::env::temp_dir().join(format!("lgl-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.dot");
        render_document(
            r#"{ edges: [{ from: "x", to: "y" }] }"#,
            &Config::default(),
            OutputFormat::Dot,
            Some(&path),
        )
        .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("x -> y;"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
