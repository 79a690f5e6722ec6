//! Format-selection expressions understood by the inspector.
//!
//! The grammar is a small, fixed subset of the inspector's language:
//!
//! ```text
//! expr     := merge ( "/" merge )*
//! merge    := atom ( "+" atom )?
//! atom     := selector ( "[ext=" EXT "]" )?
//! selector := "best" | "bestaudio" | "bestvideo" | FORMAT_ID
//! ```
//!
//! Expressions are validated when built, so a rendered expression is always
//! well formed.

use crate::error::GrabError;
use std::fmt;
use std::str::FromStr;

/// Characters that carry meaning in the expression language
const RESERVED_CHARS: &[char] = &['+', '/', '[', ']', ',', '(', ')', '#', '*'];

/// Bare extensions the inspector treats as "best stream in this container"
const EXTENSION_SELECTORS: &[&str] = &[
    "3gp", "aac", "aiff", "alac", "avi", "flac", "flv", "m4a", "mhtml", "mka", "mkv", "mov",
    "mp3", "mp4", "ogg", "opus", "wav", "webm",
];

/// Stream selector at the heart of an atom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Best stream carrying both audio and video
    Best,
    /// Best audio-only stream
    BestAudio,
    /// Best video-only stream
    BestVideo,
    /// A specific stream by inspector format id
    Id(String),
}

impl Selector {
    fn keyword(&self) -> Option<&'static str> {
        match self {
            Selector::Best => Some("best"),
            Selector::BestAudio => Some("bestaudio"),
            Selector::BestVideo => Some("bestvideo"),
            Selector::Id(_) => None,
        }
    }
}

/// A selector with an optional container filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    selector: Selector,
    ext: Option<String>,
}

impl Atom {
    pub fn best() -> Self {
        Self::from(Selector::Best)
    }

    pub fn best_audio() -> Self {
        Self::from(Selector::BestAudio)
    }

    pub fn best_video() -> Self {
        Self::from(Selector::BestVideo)
    }

    /// Select a specific format id
    pub fn id(format_id: &str) -> Result<Self, GrabError> {
        validate_format_id(format_id)?;
        Ok(Self::from(Selector::Id(format_id.to_string())))
    }

    /// Restrict the atom to one container extension
    pub fn with_ext(mut self, ext: &str) -> Result<Self, GrabError> {
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(GrabError::InvalidRequest(format!(
                "Invalid extension filter: {:?}",
                ext
            )));
        }
        self.ext = Some(ext.to_ascii_lowercase());
        Ok(self)
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }
}

impl From<Selector> for Atom {
    fn from(selector: Selector) -> Self {
        Self {
            selector,
            ext: None,
        }
    }
}

/// One alternative: a single atom, or two atoms merged by the transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    primary: Atom,
    merged: Option<Atom>,
}

impl Alternative {
    pub fn single(atom: Atom) -> Self {
        Self {
            primary: atom,
            merged: None,
        }
    }

    pub fn merge(video: Atom, audio: Atom) -> Self {
        Self {
            primary: video,
            merged: Some(audio),
        }
    }

    pub fn is_merge(&self) -> bool {
        self.merged.is_some()
    }
}

/// A complete format expression: alternatives tried left to right
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatExpr {
    alternatives: Vec<Alternative>,
}

impl FormatExpr {
    pub fn new(first: Alternative) -> Self {
        Self {
            alternatives: vec![first],
        }
    }

    /// Add a fallback alternative
    pub fn or(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// `bestaudio/best`
    pub fn best_audio() -> Self {
        Self::new(Alternative::single(Atom::best_audio())).or(Alternative::single(Atom::best()))
    }

    /// `ID+bestaudio[ext=m4a]/best`
    pub fn chosen_video(format_id: &str) -> Result<Self, GrabError> {
        Ok(Self::new(Alternative::merge(
            Atom::id(format_id)?,
            Atom::best_audio().with_ext("m4a")?,
        ))
        .or(Alternative::single(Atom::best())))
    }

    /// `bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best`
    pub fn default_video() -> Self {
        // Literal extensions always validate.
        let mp4 = |atom: Atom| Atom {
            ext: Some("mp4".to_string()),
            ..atom
        };
        let m4a = Atom {
            ext: Some("m4a".to_string()),
            ..Atom::best_audio()
        };
        Self::new(Alternative::merge(mp4(Atom::best_video()), m4a))
            .or(Alternative::single(mp4(Atom::best())))
            .or(Alternative::single(Atom::best()))
    }
}

fn validate_format_id(format_id: &str) -> Result<(), GrabError> {
    if format_id.is_empty() {
        return Err(GrabError::InvalidRequest("Empty format id".to_string()));
    }
    if format_id
        .chars()
        .any(|c| c.is_whitespace() || RESERVED_CHARS.contains(&c))
    {
        return Err(GrabError::InvalidRequest(format!(
            "Invalid format id: {:?}",
            format_id
        )));
    }
    if is_inspector_keyword(format_id) {
        return Err(GrabError::InvalidRequest(format!(
            "Format id {:?} collides with a keyword",
            format_id
        )));
    }
    Ok(())
}

/// Would the inspector read `id` as a selector rather than a format id?
fn is_inspector_keyword(id: &str) -> bool {
    if matches!(id, "all" | "mergeall") || EXTENSION_SELECTORS.contains(&id) {
        return true;
    }

    // best|worst|b|w, then video|audio|v|a, then an optional ".N" with N >= 1
    let head = match id.split_once('.') {
        Some((head, n)) => {
            let indexed = !n.is_empty()
                && !n.starts_with('0')
                && n.chars().all(|c| c.is_ascii_digit());
            if !indexed {
                return false;
            }
            head
        }
        None => id,
    };
    let rest = ["best", "worst", "b", "w"]
        .iter()
        .find_map(|quality| head.strip_prefix(*quality));
    matches!(rest, Some("" | "video" | "audio" | "v" | "a"))
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Id(id) => write!(f, "{}", id)?,
            other => write!(f, "{}", other.keyword().unwrap_or_default())?,
        }
        if let Some(ext) = &self.ext {
            write!(f, "[ext={}]", ext)?;
        }
        Ok(())
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        if let Some(merged) = &self.merged {
            write!(f, "+{}", merged)?;
        }
        Ok(())
    }
}

impl fmt::Display for FormatExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, alternative) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", alternative)?;
        }
        Ok(())
    }
}

impl FromStr for Atom {
    type Err = GrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, filter) = match s.find('[') {
            Some(open) => {
                let filter = s[open..]
                    .strip_prefix("[ext=")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| {
                        GrabError::InvalidRequest(format!("Unsupported filter in {:?}", s))
                    })?;
                (&s[..open], Some(filter))
            }
            None => (s, None),
        };

        let atom = match head {
            "best" => Atom::best(),
            "bestaudio" => Atom::best_audio(),
            "bestvideo" => Atom::best_video(),
            id => Atom::id(id)?,
        };

        match filter {
            Some(ext) => atom.with_ext(ext),
            None => Ok(atom),
        }
    }
}

impl FromStr for FormatExpr {
    type Err = GrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut alternatives = Vec::new();

        for part in s.split('/') {
            let atoms: Vec<&str> = part.split('+').collect();
            let alternative = match atoms.as_slice() {
                [single] => Alternative::single(single.parse()?),
                [video, audio] => Alternative::merge(video.parse()?, audio.parse()?),
                _ => {
                    return Err(GrabError::InvalidRequest(format!(
                        "Cannot merge more than two streams: {:?}",
                        part
                    )))
                }
            };
            alternatives.push(alternative);
        }

        Ok(Self { alternatives })
    }
}
