use rand::Rng;
use serde_json::{json, Value};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

// Two of three lean Portuguese, matching the default cookie locale.
const ACCEPT_LANGUAGES: &[&str] = &[
    "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7",
    "en-US,en;q=0.9,pt;q=0.8",
    "pt,pt-BR;q=0.9,en;q=0.8",
];

/// InnerTube client variants. Each one is blocked somewhat independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientContext {
    Web,
    Android,
    Ios,
}

impl ClientContext {
    pub const ALL: [ClientContext; 3] = [ClientContext::Web, ClientContext::Android, ClientContext::Ios];

    /// Round robin over [`ClientContext::ALL`]; `attempt` starts at 1.
    pub fn for_attempt(attempt: u32) -> Self {
        let index = (attempt.max(1) - 1) as usize % Self::ALL.len();
        Self::ALL[index]
    }

    pub fn client_name(&self) -> &'static str {
        match self {
            ClientContext::Web => "WEB",
            ClientContext::Android => "ANDROID",
            ClientContext::Ios => "IOS",
        }
    }

    pub fn client_version(&self) -> &'static str {
        match self {
            ClientContext::Web => "2.20231208.00.00",
            ClientContext::Android => "18.48.37",
            ClientContext::Ios => "18.48.3",
        }
    }

    /// The `context` object of an InnerTube request body.
    pub fn to_json(&self) -> Value {
        match self {
            ClientContext::Web => json!({
                "client": {
                    "clientName": self.client_name(),
                    "clientVersion": self.client_version(),
                }
            }),
            ClientContext::Android => json!({
                "client": {
                    "clientName": self.client_name(),
                    "clientVersion": self.client_version(),
                    "androidSdkVersion": 30,
                }
            }),
            ClientContext::Ios => json!({
                "client": {
                    "clientName": self.client_name(),
                    "clientVersion": self.client_version(),
                    "deviceModel": "iPhone14,3",
                }
            }),
        }
    }
}

/// Browser fingerprint for a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    pub accept_language: String,
    pub client_context: ClientContext,
}

impl RequestIdentity {
    /// Random user agent and language, client context rotated by attempt.
    pub fn for_attempt(attempt: u32) -> Self {
        let mut rng = rand::rng();
        Self {
            user_agent: USER_AGENTS[rng.random_range(0..USER_AGENTS.len())].to_string(),
            accept_language: ACCEPT_LANGUAGES[rng.random_range(0..ACCEPT_LANGUAGES.len())]
                .to_string(),
            client_context: ClientContext::for_attempt(attempt),
        }
    }
}
