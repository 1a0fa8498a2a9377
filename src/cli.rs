use clap::{Parser, ValueEnum};

use crate::zip::{CompressionLevel, CompressionMethod, DuplicateFilter};

#[derive(Parser, Debug)]
#[command(name = "zipfly")]
#[command(version)]
#[command(about = "Create ZIP/ZIP64 archives, to a file or streamed to stdout", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipfly out.zip a.txt docs/b.pdf       deflate two files into out.zip\n  \
  zipfly -m bzip2 -n out.zip big.log    bzip2, never overwrite out.zip\n  \
  zipfly - logs/*.txt | ssh host 'cat > logs.zip'   stream to stdout")]
pub struct Cli {
    /// Archive to create, or `-` to stream to stdout
    #[arg(value_name = "ARCHIVE")]
    pub archive: String,

    /// Files to add
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<String>,

    /// Compression method
    #[arg(short = 'm', long, value_enum, default_value_t = MethodArg::Deflate)]
    pub method: MethodArg,

    /// Deflate compression level
    #[arg(short = 'l', long, value_enum, default_value_t = LevelArg::Normal)]
    pub level: LevelArg,

    /// Write a classic archive without ZIP64 extensions
    #[arg(long)]
    pub no_zip64: bool,

    /// Streaming mode: never seek, write data descriptors
    #[arg(short = 's', long)]
    pub stream: bool,

    /// Never overwrite an existing archive
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Reject repeated in-archive paths
    #[arg(long, value_enum, default_value_t = DedupeArg::None)]
    pub dedupe: DedupeArg,

    /// Junk paths (store file names only)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Dump every header as it is written
    #[arg(long)]
    pub debug: bool,

    /// Quiet mode
    #[arg(short = 'q')]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    Store,
    Deflate,
    Bzip2,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelArg {
    Min,
    Normal,
    Max,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeArg {
    None,
    Path,
    Hash,
}

impl From<MethodArg> for CompressionMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Store => CompressionMethod::Store,
            MethodArg::Deflate => CompressionMethod::Deflate,
            MethodArg::Bzip2 => CompressionMethod::Bzip2,
        }
    }
}

impl From<LevelArg> for CompressionLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Min => CompressionLevel::Min,
            LevelArg::Normal => CompressionLevel::Normal,
            LevelArg::Max => CompressionLevel::Max,
        }
    }
}

impl From<DedupeArg> for DuplicateFilter {
    fn from(arg: DedupeArg) -> Self {
        match arg {
            DedupeArg::None => DuplicateFilter::None,
            DedupeArg::Path => DuplicateFilter::ByFullPath,
            DedupeArg::Hash => DuplicateFilter::ByPathHash,
        }
    }
}

impl Cli {
    pub fn is_stdout(&self) -> bool {
        self.archive == "-"
    }

    /// Stdout cannot seek, so it always streams.
    pub fn is_streaming(&self) -> bool {
        self.stream || self.is_stdout()
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_forces_streaming() {
        let cli = Cli::parse_from(["zipfly", "-", "a.txt"]);
        assert!(cli.is_stdout());
        assert!(cli.is_streaming());
        assert_eq!(cli.method, MethodArg::Deflate);
    }

    #[test]
    fn options_map_to_library_types() {
        let cli = Cli::parse_from([
            "zipfly", "-m", "bzip2", "-l", "max", "--dedupe", "hash", "-n", "out.zip", "a", "b",
        ]);
        assert!(!cli.is_streaming());
        assert!(cli.never_overwrite);
        assert_eq!(cli.files, ["a", "b"]);
        assert_eq!(CompressionMethod::from(cli.method), CompressionMethod::Bzip2);
        assert_eq!(CompressionLevel::from(cli.level), CompressionLevel::Max);
        assert_eq!(DuplicateFilter::from(cli.dedupe), DuplicateFilter::ByPathHash);
    }

    #[test]
    fn files_are_required() {
        assert!(Cli::try_parse_from(["zipfly", "out.zip"]).is_err());
    }
}
