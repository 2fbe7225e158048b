use clap::{ArgAction, Parser};
use hlsgrab_engine::ProxyType;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Manual HLS downloader for fragmented-MP4 streams",
    long_about = "Downloads an HLS stream made of fragmented-MP4 (fMP4/CMAF) segments one\n\
                  segment at a time and joins them into a single playable file.\n\
                  \n\
                  Meant as a fallback for streams general-purpose downloaders cannot handle,\n\
                  such as short-lived signed segment URLs. Master playlists require a quality\n\
                  label (e.g. 720p); an optional time window downloads only the segments that\n\
                  overlap it."
)]
pub struct CliArgs {
    /// Master or media playlist URL
    #[arg(required = true, help = "URL of the master or media playlist (.m3u8)")]
    pub url: String,

    /// Output path; `.mp4` is appended when missing
    #[arg(
        short,
        long,
        help = "Output file path. The .mp4 extension is appended when missing"
    )]
    pub output: PathBuf,

    #[arg(
        short,
        long,
        help = "Quality label to pick from a master playlist (e.g. 1080p, 720p, 480p)"
    )]
    pub quality: Option<String>,

    /// Start of the time window
    #[arg(
        long,
        help = "Start of the time window: seconds (90), with unit (90s, 30m, 1.5h) or clock form (HH:MM:SS)"
    )]
    pub start: Option<String>,

    /// End of the time window
    #[arg(
        long,
        help = "End of the time window, same formats as --start"
    )]
    pub end: Option<String>,

    #[arg(
        long,
        help = "Download at most this many segments (0 for no limit)"
    )]
    pub max_segments: Option<usize>,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(
        long,
        help = "Cookies sent with every request, browser format: 'NAME=value; OTHER=value'"
    )]
    pub cookies: Option<String>,

    #[arg(long, help = "User-Agent header (defaults to a desktop browser)")]
    pub user_agent: Option<String>,

    #[arg(long, help = "Referer header")]
    pub referer: Option<String>,

    #[arg(long, help = "Origin header")]
    pub origin: Option<String>,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "60",
        help = "Overall timeout in seconds for each HTTP request (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    #[arg(
        long,
        default_value = "30",
        help = "Timeout for each read from a response body, in seconds (0 disables)"
    )]
    pub read_timeout: u64,

    #[arg(
        long,
        default_value = "15",
        help = "Timeout for fetching playlists in seconds"
    )]
    pub playlist_timeout: u64,

    #[arg(
        long,
        default_value = "30",
        help = "Timeout for individual segment downloads in seconds (0 disables it)"
    )]
    pub segment_timeout: u64,

    #[arg(
        long,
        default_value = "0",
        help = "Retry attempts for a segment after a transient failure (5xx, 429, network errors)"
    )]
    pub retries: u32,

    #[arg(
        long,
        default_value = "1",
        help = "Maximum number of concurrent segment downloads (1 downloads sequentially)"
    )]
    pub concurrency: usize,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    #[arg(long, value_enum, default_value = "http", help = "Proxy type")]
    pub proxy_type: ProxyType,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        help = "Use system proxy settings if no explicit proxy is configured"
    )]
    pub use_system_proxy: bool,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    /// Show progress bars for operations
    #[arg(short = 'P', long = "progress", help = "Show a segment progress bar")]
    pub show_progress: bool,

    #[arg(long, help = "Print download events as JSON lines on stdout")]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    #[arg(long, help = "Do not write hlsgrab.log")]
    pub no_log_file: bool,
}
