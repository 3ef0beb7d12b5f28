use crate::config::toml_config::{ParticipantConfig, ServiceConfig};
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "library-loans")]
#[command(about = "Library loan ledger with due-soon reminders")]
pub struct ServiceArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address to serve the RPC surface on
    #[arg(long)]
    pub listen: Option<String>,

    /// Use a settable simulated clock instead of system time
    #[arg(long, env = "SIMULATE_TIME")]
    pub simulate_time: Option<bool>,

    /// RFC 3339 start of simulated time
    #[arg(long)]
    pub start_time: Option<String>,

    /// Interval between due-soon scans in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ServiceArgs {
    /// Loads the configuration file (or defaults) and applies command line overrides.
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.service.listen_addr = listen.clone();
        }
        if let Some(simulate) = self.simulate_time {
            config.clock.simulate = simulate;
        }
        if let Some(start) = &self.start_time {
            config.clock.start = Some(start.clone());
        }
        if let Some(interval) = self.interval {
            config.scanner.interval_seconds = interval;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "time-coordinator")]
#[command(about = "Fans simulated time out to library services")]
pub struct CoordinatorArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address to serve SetTime/AdvanceBy on
    #[arg(long)]
    pub listen: Option<String>,

    /// Participants as name=url, comma separated
    #[arg(long, value_delimiter = ',')]
    pub participants: Vec<String>,

    /// RFC 3339 time the coordinator starts from
    #[arg(long)]
    pub start_time: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CoordinatorArgs {
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.coordinator.listen_addr = listen.clone();
        }
        if let Some(start) = &self.start_time {
            config.clock.start = Some(start.clone());
        }
        for participant in &self.participants {
            let (name, url) = match participant.split_once('=') {
                Some((name, url)) => (name.to_string(), url.to_string()),
                None => (participant.clone(), participant.clone()),
            };
            config
                .coordinator
                .participants
                .push(ParticipantConfig { name, url });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_overrides_apply() {
        let args = ServiceArgs::parse_from([
            "library-loans",
            "--listen",
            "0.0.0.0:6000",
            "--simulate-time",
            "true",
            "--start-time",
            "2024-01-01T00:00:00Z",
            "--interval",
            "30",
        ]);

        let config = args.load_config().unwrap();
        assert_eq!(config.service.listen_addr, "0.0.0.0:6000");
        assert!(config.clock.simulate);
        assert_eq!(config.clock.start.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(config.scanner.interval_seconds, 30);
    }

    #[test]
    fn test_coordinator_participants_parse() {
        let args = CoordinatorArgs::parse_from([
            "time-coordinator",
            "--participants",
            "loans=http://127.0.0.1:50051,http://127.0.0.1:50053",
        ]);

        let config = args.load_config().unwrap();
        let participants = &config.coordinator.participants;
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].name, "loans");
        assert_eq!(participants[0].url, "http://127.0.0.1:50051");
        assert_eq!(participants[1].name, "http://127.0.0.1:50053");
    }
}
