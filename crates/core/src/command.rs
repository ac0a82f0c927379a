use crate::error::BridgeError;

/// Multiplier applied to the seconds typed after `-seek` before the value is
/// handed to the session.
///
/// Found empirically: some sources (Spotify among them) only land on the
/// requested second with this factor. It is not derived from any documented
/// unit, so keep it isolated here.
pub const SEEK_SCALE: i64 = 9_999_999;

/// Command strings listed by `-help`, in display order
pub const HELP_COMMANDS: [&str; 12] = [
    "-all",
    "-cover",
    "-name",
    "-artist",
    "-album",
    "-timeline",
    "-skip",
    "-back",
    "-pause",
    "-sessions",
    "-seek",
    "exit",
];

/// One line of REPL input after normalization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    All,
    Cover,
    Name,
    Artist,
    Album,
    Timeline,
    Skip,
    Back,
    Pause,
    Seek,
    Sessions,
    Help,
    /// Terminates the loop (empty line or `exit`)
    Exit,
    Unknown(String),
}

impl Command {
    /// Parse a raw input line. Matching ignores case and surrounding whitespace.
    pub fn parse(line: &str) -> Self {
        let normalized = normalize(line);
        match normalized.as_str() {
            "" | "exit" => Command::Exit,
            "-all" => Command::All,
            "-cover" => Command::Cover,
            "-name" => Command::Name,
            "-artist" => Command::Artist,
            "-album" => Command::Album,
            "-timeline" => Command::Timeline,
            "-skip" => Command::Skip,
            "-back" => Command::Back,
            "-pause" => Command::Pause,
            "-seek" => Command::Seek,
            "-sessions" => Command::Sessions,
            "-help" => Command::Help,
            _ => Command::Unknown(normalized),
        }
    }

    /// Whether the command reads metadata, playback info and timeline
    pub fn needs_snapshot(&self) -> bool {
        matches!(
            self,
            Command::All
                | Command::Cover
                | Command::Name
                | Command::Artist
                | Command::Album
                | Command::Timeline
        )
    }
}

/// Normalization for command matching (trim whitespace, lowercase)
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Turn the line typed after `-seek` into a scaled position
pub fn parse_seek_position(input: &str, scale: i64) -> Result<i64, BridgeError> {
    let seconds: i64 = input
        .trim()
        .parse()
        .map_err(|_| BridgeError::InvalidSeekInput)?;
    seconds
        .checked_mul(scale)
        .ok_or(BridgeError::InvalidSeekInput)
}
