//! Configuração do humanizer carregada a partir de `humanizer.toml`.
//!
//! A struct [`HumanizerConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `HUMANIZER_API_KEY` tem precedência sobre o arquivo.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::credits::PlanContext;
use crate::error::HumanizerError;
use crate::ledger::UsageLedger;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "humanizer.toml";

/// Variável de ambiente que sobrescreve `api_key`.
pub const API_KEY_ENV: &str = "HUMANIZER_API_KEY";

/// Configuração de nível superior carregada de `humanizer.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct HumanizerConfig {
    /// Chave da API enviada no cabeçalho `apikey`.
    #[serde(default)]
    pub api_key: String,

    /// URL base do serviço de humanização.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Versão do modelo enviada em cada submissão.
    #[serde(default = "default_model")]
    pub model: String,

    /// Intervalo fixo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Número máximo de consultas antes de desistir do job.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout de conexão HTTP, em segundos.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout total de cada requisição HTTP, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Plano da conta. Ausente significa uso anônimo.
    #[serde(default)]
    pub plan: Option<PlanConfig>,
}

/// Plano de assinatura e saldo de créditos do usuário.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    #[serde(default = "default_plan_name")]
    pub name: String,
    pub character_limit: usize,
    pub total_credits: u64,
    #[serde(default)]
    pub used_credits: u64,
}

impl PlanConfig {
    /// Ledger inicial correspondente a este plano (sem histórico).
    pub fn ledger(&self) -> UsageLedger {
        UsageLedger::new(self.total_credits, self.used_credits)
    }

    pub fn context(&self) -> PlanContext {
        PlanContext {
            character_limit: self.character_limit,
            credits_remaining: self.total_credits.saturating_sub(self.used_credits),
        }
    }
}

// Valor padrão para a URL base do serviço.
fn default_base_url() -> String {
    "https://humanize.undetectable.ai".to_string()
}

// Valor padrão para o modelo: "v11".
fn default_model() -> String {
    "v11".to_string()
}

// Valor padrão para o intervalo entre consultas: 3000ms.
fn default_poll_interval_ms() -> u64 {
    3000
}

// Valor padrão para consultas máximas: 40.
fn default_max_attempts() -> u32 {
    40
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_plan_name() -> String {
    "Custom".to_string()
}

impl Default for HumanizerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            plan: None,
        }
    }
}

impl HumanizerConfig {
    /// Carrega a configuração de `humanizer.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, HumanizerError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self, HumanizerError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<HumanizerConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração para a chave API.
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            config.api_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita combinações que fariam o polling nunca terminar ou nunca começar.
    pub fn validate(&self) -> Result<(), HumanizerError> {
        if self.max_attempts == 0 {
            return Err(HumanizerError::Config("max_attempts must be at least 1".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(HumanizerError::Config("poll_interval_ms must be at least 1".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(HumanizerError::Config("base_url must not be empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
