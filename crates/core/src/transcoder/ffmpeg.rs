//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use super::config::TranscoderConfig;
use super::error::TranscodeError;
use super::traits::Transcoder;
use super::types::{OutputFormat, TranscodeJob, TranscodeProgress, TranscodeResult, TranscodeSpec};

/// Reference colour keyed out when background removal is on (the off-white drawing paper).
pub const BACKGROUND_KEY_COLOR: &str = "0xF5F5F5";

/// libwebp quality factor.
const WEBP_QUALITY: u32 = 80;

/// Alpha level below which paletteuse treats a pixel as transparent.
const GIF_ALPHA_THRESHOLD: u32 = 128;

/// Reads one line of ffmpeg output, replacing invalid UTF-8.
///
/// Returns `None` at end of stream or on a read error.
async fn next_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(
            String::from_utf8_lossy(buf)
                .trim_end_matches(['\r', '\n'])
                .to_string(),
        ),
    }
}

/// Builds the per-frame filter chain, in fixed order: crop, scale, fps, colour key.
pub fn build_filters(spec: &TranscodeSpec) -> Vec<String> {
    let mut filters = Vec::new();

    if spec.has_crop() {
        // crop=out_w:out_h:x:y relative to the input dimensions
        filters.push(format!(
            "crop=in_w-{}:in_h-{}:{}:{}",
            spec.crop_left + spec.crop_right,
            spec.crop_top + spec.crop_bottom,
            spec.crop_left,
            spec.crop_top
        ));
    }

    filters.push(format!("scale={}:-1:flags=lanczos", spec.target_width));
    filters.push(format!("fps={}", spec.fps));

    if spec.remove_background {
        filters.push(format!(
            "colorkey={}:{}:{}",
            BACKGROUND_KEY_COLOR, spec.background_similarity, spec.background_blend
        ));
        filters.push("format=rgba".to_string());
    }

    filters
}

/// Builds the full `-vf` graph, including the palette stage for GIF output.
pub fn build_filter_graph(spec: &TranscodeSpec) -> String {
    let chain = build_filters(spec).join(",");

    match spec.output_format {
        OutputFormat::Webp => chain,
        OutputFormat::Gif if spec.remove_background => format!(
            "{},split[s0][s1];[s0]palettegen=reserve_transparent=1[p];[s1][p]paletteuse=alpha_threshold={}",
            chain, GIF_ALPHA_THRESHOLD
        ),
        OutputFormat::Gif => format!(
            "{},split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
            chain
        ),
    }
}

/// Checks the spec before handing it to ffmpeg.
pub fn validate_spec(spec: &TranscodeSpec) -> Result<(), TranscodeError> {
    if spec.target_width == 0 {
        return Err(TranscodeError::invalid_spec("target_width must be non-zero"));
    }
    if spec.fps == 0 {
        return Err(TranscodeError::invalid_spec("fps must be non-zero"));
    }
    if spec.remove_background {
        if !(spec.background_similarity > 0.0 && spec.background_similarity <= 1.0) {
            return Err(TranscodeError::invalid_spec(
                "background_similarity must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&spec.background_blend) {
            return Err(TranscodeError::invalid_spec(
                "background_blend must be in [0, 1]",
            ));
        }
    }
    Ok(())
}

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds the ffmpeg argument list for a job.
    fn build_args(&self, input_path: &Path, output_path: &Path, spec: &TranscodeSpec) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vf".to_string(),
            build_filter_graph(spec),
        ];

        match spec.output_format {
            OutputFormat::Webp => {
                args.extend([
                    "-c:v".to_string(),
                    "libwebp".to_string(),
                    "-pix_fmt".to_string(),
                    "yuva420p".to_string(),
                    "-lossless".to_string(),
                    "0".to_string(),
                    "-quality".to_string(),
                    WEBP_QUALITY.to_string(),
                    "-loop".to_string(),
                    "0".to_string(),
                    "-an".to_string(),
                ]);
            }
            OutputFormat::Gif => {
                args.extend(["-loop".to_string(), "0".to_string()]);
                if spec.remove_background {
                    args.extend(["-gifflags".to_string(), "+transdiff".to_string()]);
                }
                args.push("-an".to_string());
            }
        }

        // Log level and progress
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output_path.to_string_lossy().to_string());

        args
    }

    async fn run_transcode(&self, job: &TranscodeJob) -> Result<TranscodeResult, TranscodeError> {
        let start = Instant::now();

        validate_spec(&job.spec)?;

        if !job.input_path.exists() {
            return Err(TranscodeError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                TranscodeError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(&job.input_path, &job.output_path, &job.spec);
        info!(
            job_id = %job.job_id,
            "FFmpeg command: {} {}",
            self.config.ffmpeg_path.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::failed("ffmpeg stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr);

        let time_regex = Regex::new(r"out_time_ms=(\d+)").ok();
        let speed_regex = Regex::new(r"speed=\s*(\d+\.?\d*)x").ok();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut last_progress_log = Instant::now();
            let progress_interval = Duration::from_millis(1000);
            let mut error_output = String::new();
            let mut progress = TranscodeProgress {
                job_id: job.job_id.clone(),
                time_secs: 0.0,
                speed: None,
            };

            let mut buf = Vec::new();
            while let Some(line) = next_lossy_line(&mut reader, &mut buf).await {
                if line.contains("Error") || line.contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }

                if let Some(caps) = time_regex.as_ref().and_then(|re| re.captures(&line)) {
                    if let Some(us) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                        // out_time_ms is reported in microseconds
                        progress.time_secs = us / 1_000_000.0;
                    }
                }

                if let Some(caps) = speed_regex.as_ref().and_then(|re| re.captures(&line)) {
                    if let Some(speed) = caps.get(1) {
                        progress.speed = Some(format!("{}x", speed.as_str()));
                    }
                }

                if last_progress_log.elapsed() >= progress_interval {
                    debug!(
                        job_id = %progress.job_id,
                        time_secs = progress.time_secs,
                        speed = progress.speed.as_deref().unwrap_or("?"),
                        "Transcoding"
                    );
                    last_progress_log = Instant::now();
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    warn!(job_id = %job.job_id, "FFmpeg error: {}", error_output.trim());
                    return Err(TranscodeError::failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(TranscodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| TranscodeError::failed("Output file not created", None))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id = %job.job_id,
            output = %job.output_path.display(),
            size_bytes = output_meta.len(),
            duration_ms,
            "Transcode complete"
        );

        Ok(TranscodeResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms,
        })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(&self, job: TranscodeJob) -> Result<TranscodeResult, TranscodeError> {
        self.run_transcode(&job).await
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TranscodeError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                })
            }
            Err(e) => Err(TranscodeError::Io(e)),
        }
    }
}
