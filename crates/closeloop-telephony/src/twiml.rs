//! TwiML call-control document builder.
//!
//! Covers the three verbs this system emits: `<Say>`, `<Connect><Stream>`,
//! and `<Hangup>`. Text and attribute values are XML-escaped.

/// The voice used for spoken fallback messages.
const SAY_VOICE: &str = "Polly.Joanna";

#[derive(Debug, Clone)]
enum Verb {
    Say(String),
    ConnectStream {
        url: String,
        track: String,
        name: String,
    },
    Hangup,
}

/// A TwiML `<Response>` document under construction.
#[derive(Debug, Clone, Default)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `<Say>` verb.
    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    /// Appends a `<Connect><Stream>` verb pointing the call's media at the
    /// given WebSocket URL. `track` selects which audio leg is forwarded
    /// (the voice platform wants `inbound_track` and returns agent audio
    /// over the same socket itself).
    pub fn connect_stream(
        mut self,
        url: impl Into<String>,
        track: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::ConnectStream {
            url: url.into(),
            track: track.into(),
            name: name.into(),
        });
        self
    }

    /// Appends a `<Hangup/>` verb.
    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    /// A spoken apology followed by hangup — the graceful-degradation
    /// document returned whenever the call cannot be bridged.
    pub fn apology(message: &str) -> Self {
        Self::new().say(message).hangup()
    }

    /// Renders the document as XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    xml.push_str(&format!(
                        "<Say voice=\"{}\">{}</Say>",
                        SAY_VOICE,
                        escape_xml(text)
                    ));
                }
                Verb::ConnectStream { url, track, name } => {
                    xml.push_str(&format!(
                        "<Connect><Stream url=\"{}\" track=\"{}\" name=\"{}\"/></Connect>",
                        escape_xml(url),
                        escape_xml(track),
                        escape_xml(name)
                    ));
                }
                Verb::Hangup => xml.push_str("<Hangup/>"),
            }
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
