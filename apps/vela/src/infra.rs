use vela_application::config::{BrokerKind, Config};
use vela_domain::repositories::artifacts::ArtifactWriter;
use vela_domain::repositories::broker::Broker;
use vela_domain::repositories::market_data::MarketDataRepository;
use vela_infrastructure::artifacts::FilesystemArtifactWriter;
use vela_infrastructure::broker::rest::PAPER_BASE_URL;
use vela_infrastructure::broker::{PaperBroker, RestBroker, RestBrokerConfig};
use vela_infrastructure::market_data::CsvMarketDataRepository;

pub struct EngineDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub artifacts: Box<dyn ArtifactWriter>,
}

pub struct ValidateDeps {
    pub market_data: Box<dyn MarketDataRepository>,
}

pub struct PaperDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub broker: BrokerHandle,
}

/// Concrete broker picked by `[paper].broker`.
pub enum BrokerHandle {
    Memory(PaperBroker),
    Rest(RestBroker),
}

impl BrokerHandle {
    pub fn as_broker(&self) -> &dyn Broker {
        match self {
            BrokerHandle::Memory(broker) => broker,
            BrokerHandle::Rest(broker) => broker,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BrokerHandle::Memory(_) => "memory",
            BrokerHandle::Rest(_) => "rest",
        }
    }
}

pub fn build_engine_deps(config: &Config) -> Result<EngineDeps, String> {
    Ok(EngineDeps {
        market_data: build_market_data_repo(config)?,
        artifacts: Box::new(FilesystemArtifactWriter::new()),
    })
}

pub fn build_validate_deps(config: &Config) -> Result<ValidateDeps, String> {
    Ok(ValidateDeps {
        market_data: build_market_data_repo(config)?,
    })
}

pub fn build_paper_deps(config: &Config) -> Result<PaperDeps, String> {
    Ok(PaperDeps {
        market_data: build_market_data_repo(config)?,
        broker: build_broker(config)?,
    })
}

fn build_market_data_repo(config: &Config) -> Result<Box<dyn MarketDataRepository>, String> {
    if config.data.path.trim().is_empty() {
        return Err("data.path must not be empty".to_string());
    }
    Ok(Box::new(CsvMarketDataRepository::new(&config.data.path)))
}

fn build_broker(config: &Config) -> Result<BrokerHandle, String> {
    let paper = config.paper_or_default();
    match paper.broker {
        BrokerKind::Memory => {
            let cash = paper.cash.unwrap_or(config.run.initial_capital);
            Ok(BrokerHandle::Memory(PaperBroker::new(cash)))
        }
        BrokerKind::Rest => {
            let broker_config = config
                .broker
                .as_ref()
                .ok_or_else(|| "paper.broker = \"rest\" requires a [broker] section".to_string())?;
            let (key_id, secret_key) = broker_config.credentials()?;
            let base_url = broker_config
                .base_url
                .clone()
                .unwrap_or_else(|| PAPER_BASE_URL.to_string());
            let broker = RestBroker::new(RestBrokerConfig {
                base_url: base_url.clone(),
                key_id,
                secret_key,
                timeout_ms: broker_config.timeout_ms,
                retries: broker_config.retries,
            })
            .map_err(|err| format!("failed to init broker client (url={base_url}): {err}"))?;
            Ok(BrokerHandle::Rest(broker))
        }
    }
}
