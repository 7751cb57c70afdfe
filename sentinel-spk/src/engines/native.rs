//! Native platform TTS engine

use super::Speaker;
use crate::config::SpeechConfig;
use crate::error::SpeechError;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

const MAX_TEXT_LEN: usize = 10_000;

/// Speaks through the platform's command line synthesizer.
#[derive(Debug, Clone)]
pub struct NativeSpeaker {
    program: &'static str,
    rate: u32,
    volume: f32,
    voice: Option<String>,
}

impl NativeSpeaker {
    pub fn new(config: &SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let program = platform_program()
            .ok_or_else(|| SpeechError::Engine("No native TTS engine for this platform".to_string()))?;

        let available = std::process::Command::new(program)
            .arg(version_flag(program))
            .output()
            .is_ok();
        if !available {
            return Err(SpeechError::Engine(format!("{} not available", program)));
        }

        Ok(Self {
            program,
            rate: config.rate,
            volume: config.volume,
            voice: config.voice.clone(),
        })
    }

    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(self.program);
        let mut text = text.to_string();
        match self.program {
            "say" => {
                cmd.arg("-r").arg(self.rate.to_string());
                if let Some(voice) = &self.voice {
                    cmd.arg("-v").arg(voice);
                }
                // say has no volume flag; it reads an embedded volm command, 0.0-1.0
                text = format!("[[volm {:.2}]] {}", self.volume.clamp(0.0, 1.0), text);
            }
            _ => {
                // espeak-ng amplitude is 0-200, 100 being normal
                let amplitude = (self.volume * 100.0).round().clamp(0.0, 200.0) as u32;
                cmd.arg("-s").arg(self.rate.to_string());
                cmd.arg("-a").arg(amplitude.to_string());
                if let Some(voice) = &self.voice {
                    cmd.arg("-v").arg(voice);
                }
            }
        }
        // Text goes last, after `--`, as a single argument.
        cmd.arg("--").arg(&text);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Speaker for NativeSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let sanitized = sanitize(text);
        if sanitized.is_empty() {
            return Err(SpeechError::Synthesizer("Text cannot be empty".to_string()));
        }

        debug!("Speaking via {}: {}", self.program, sanitized);
        let output = self.command(&sanitized).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.program
    }
}

fn platform_program() -> Option<&'static str> {
    if cfg!(target_os = "macos") {
        Some("say")
    } else if cfg!(target_os = "linux") {
        Some("espeak-ng")
    } else {
        None
    }
}

fn version_flag(program: &str) -> &'static str {
    if program == "say" {
        "-v?"
    } else {
        "--version"
    }
}

/// Strip control characters and cap the length.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .take(MAX_TEXT_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}
