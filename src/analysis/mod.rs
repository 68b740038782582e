//! Analysis service: sends receipt text to the OpenAI chat-completions API
//! and returns the semicolon-delimited table the prompt mandates. Failures
//! here are never masked — a fabricated financial breakdown is worse than
//! an error.

use serde::Deserialize;
use serde_json::json;
use std::env;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4o";
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 2000;

const SYSTEM_PROMPT: &str =
    "You are a receipt analysis expert. You analyze receipt texts and structure them into tables.";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("OpenAI API key is not configured. Set OPENAI_API_KEY and restart.")]
    MissingCredential,
    #[error("OpenAI rejected the API key: {0}")]
    InvalidCredential(String),
    #[error("OpenAI rate limit reached: {0}")]
    RateLimited(String),
    #[error("Receipt text is too long for the model: {0}")]
    InputTooLong(String),
    #[error("Failed to analyze receipt: {0}")]
    Upstream(String),
}

#[derive(Debug, Clone)]
pub struct AnalysisService {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl AnalysisService {
    /// Reads `OPENAI_API_KEY` and the optional `OPENAI_BASE_URL` override.
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, base_url)
    }

    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        AnalysisService {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Categorize and total the receipt text. Returns the raw table string;
    /// this service does not parse it further.
    pub async fn analyze(&self, receipt_text: &str) -> Result<String, AnalysisError> {
        let api_key = self.api_key.as_ref().ok_or(AnalysisError::MissingCredential)?;

        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(receipt_text) }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("unexpected response shape: {}", e)))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "Не можах да обработя бележката.".to_string());

        Ok(text)
    }

    /// Diagnostic: is the configured key accepted by the API at all?
    pub async fn check_key(&self) -> (bool, String) {
        let Some(api_key) = self.api_key.as_ref() else {
            return (false, "OPENAI_API_KEY is not set".to_string());
        };

        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(api_key)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => (true, "API key is valid".to_string()),
            Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                (false, "API key was rejected".to_string())
            }
            Ok(resp) => (false, format!("unexpected status {}", resp.status())),
            Err(e) => (false, format!("check failed: {}", e)),
        }
    }
}

/// The categorization prompt. The output contract it enforces: rows grouped
/// by category, duplicates merged with summed price, first row
/// `Общо; ; <grand total>`, `;` followed by a space, no header row.
fn build_prompt(receipt_text: &str) -> String {
    format!(
        "Изпращам текст на касова бележка. Преобразувай цените с десетична точка. Създай таблица с три колони: 'Категория', 'Продукт' и 'Цена с отстъпка'.  Не записвай в колона 'Продукт' текст, който не съществува в текста на бележката. Ако има отстъпка, тя се отнася за предходния продукт и отстъпката се изважда от цената му, в таблицата включи цената след отстъпката. Опитай се за всеки продукт да определиш една от категориите: Хляб, Месо, Колбаси, Варива, Плодзеленчук, Млечни, Продукти, Десерти, Напитки, Санитарни, Разни. Ако не успееш да определиш категорията, задай 'Разни'. Групирай редовете по категории. Обедини стоките с еднакви цени и пресметни общата цена за обединените стоки. Създай таблицата в csv формат с разделител ; и я покажи. Сумирай цените в колона 'Цена с отстъпка' и сравни с ред ОБЩО от бележката, ако има разлика потърси причината и коригирай редовете на таблицата. Първият ред от таблицата да съдържа общата сума на всички продукти във формат 'Общо; ; сума'. След разделителите в таблицата да има задължително интервал и таблицата да не включва имената на колони. В отговора си ми покажи само таблицата, без обяснения как се е получила.\n\nТекст на бележката:\n{}",
        receipt_text
    )
}

/// Map an upstream error response to the failure classes callers care
/// about: bad credential, throttling, oversized input, everything else.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });

    match status {
        reqwest::StatusCode::UNAUTHORIZED => AnalysisError::InvalidCredential(message),
        reqwest::StatusCode::TOO_MANY_REQUESTS => AnalysisError::RateLimited(message),
        reqwest::StatusCode::BAD_REQUEST
            if message.contains("maximum context length") || message.contains("too long") =>
        {
            AnalysisError::InputTooLong(message)
        }
        _ => AnalysisError::Upstream(message),
    }
}
