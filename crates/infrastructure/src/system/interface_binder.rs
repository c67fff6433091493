use async_trait::async_trait;
use minke_dns_application::ports::InterfaceBinder;
use minke_dns_domain::DomainError;
use std::net::Ipv4Addr;
use tokio::process::Command;
use tracing::debug;

/// Adds and removes DNS-network addresses with `ip addr add|del`.
pub struct IpCommandBinder {
    ip_command: String,
    device: String,
}

impl IpCommandBinder {
    pub fn new(ip_command: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            ip_command: ip_command.into(),
            device: device.into(),
        }
    }

    fn arguments(&self, action: &str, address: Ipv4Addr, prefix: u8) -> Vec<String> {
        vec![
            "addr".to_string(),
            action.to_string(),
            format!("{}/{}", address, prefix),
            "dev".to_string(),
            self.device.clone(),
        ]
    }

    async fn run(&self, action: &str, address: Ipv4Addr, prefix: u8) -> Result<(), DomainError> {
        let args = self.arguments(action, address, prefix);
        let output = Command::new(&self.ip_command)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                DomainError::IoError(format!("Failed to run {}: {}", self.ip_command, e))
            })?;

        if output.status.success() {
            debug!(action, address = %address, device = %self.device, "Interface address updated");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        // Re-adding a bound address is harmless.
        if action == "add" && stderr.contains("File exists") {
            return Ok(());
        }
        Err(DomainError::Socket(format!(
            "{} {} failed: {}",
            self.ip_command,
            args.join(" "),
            stderr.trim()
        )))
    }
}

#[async_trait]
impl InterfaceBinder for IpCommandBinder {
    async fn bind(&self, address: Ipv4Addr, prefix: u8) -> Result<(), DomainError> {
        self.run("add", address, prefix).await
    }

    async fn unbind(&self, address: Ipv4Addr, prefix: u8) -> Result<(), DomainError> {
        self.run("del", address, prefix).await
    }
}
