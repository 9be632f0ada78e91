//! Realtime output via CPAL: open a device and stream a [`SharedSynth`] to it.
//!
//! Opening can fail for many host-specific reasons (no device, busy device,
//! odd sample formats). Every failure comes back as an [`AudioError`]; callers
//! are expected to fall back to [`SilentTones`](crate::tones::SilentTones).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::{AudioError, AudioResult};
use crate::tones::SharedSynth;

fn backend<E: std::fmt::Display>(e: E) -> AudioError {
    AudioError::Backend(e.to_string())
}

/// What the caller would like; anything left `None` uses the device default.
#[derive(Clone, Debug)]
pub struct OutputOptions {
    pub device_name: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Master gain handed to the synth before streaming starts.
    pub gain: f32,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self { device_name: None, sample_rate: None, channels: None, gain: 1.0 }
    }
}

/// A running output stream. Dropping it stops playback.
pub struct AudioOutput {
    _stream: cpal::Stream,
    device_name: String,
    config: cpal::StreamConfig,
}

impl AudioOutput {
    /// Open a device and start streaming `synth`. The synth is reset to the
    /// device sample rate before the first callback.
    pub fn open(synth: SharedSynth, opts: &OutputOptions) -> AudioResult<Self> {
        let device = pick_device(opts.device_name.as_deref())?;
        let sup_cfg = choose_config(&device, opts.sample_rate, opts.channels)?;
        let sample_format = sup_cfg.sample_format();
        let cfg: cpal::StreamConfig = sup_cfg.config();

        synth.reset(cfg.sample_rate.0 as f32)?;
        synth.set_gain(opts.gain)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        log::info!(target: "audio", "output {device_name}: {cfg:?} ({sample_format:?})");

        let err_fn = |e: cpal::StreamError| log::error!(target: "audio", "stream error: {e}");

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, synth, err_fn)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, synth, err_fn)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, synth, err_fn)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play().map_err(backend)?;

        Ok(Self { _stream: stream, device_name, config: cfg })
    }

    pub fn device_name(&self) -> &str { &self.device_name }
    pub fn sample_rate(&self) -> u32 { self.config.sample_rate.0 }
    pub fn channels(&self) -> u16 { self.config.channels }
}

/// Names of the host's output devices.
pub fn output_device_names() -> AudioResult<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices().map_err(backend)? {
        names.push(dev.name().map_err(backend)?);
    }
    Ok(names)
}

fn pick_device(name: Option<&str>) -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices().map_err(backend)? {
            if d.name().map_err(backend)? == name { return Ok(d); }
        }
        return Err(AudioError::DeviceNotFound(name.to_string()));
    }
    host.default_output_device().ok_or(AudioError::NoDevice)
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> AudioResult<cpal::SupportedStreamConfig> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return device.default_output_config().map_err(backend);
    }

    // Pick the closest SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs().map_err(backend)? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => u64::from(ch.abs_diff(c)), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) => if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) },
            None => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| AudioError::Backend("no supported output configs".into()))?;

    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    synth: SharedSynth,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> AudioResult<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels);
    // scratch for the mono→interleaved render; grown outside the steady state only
    let mut scratch: Vec<f32> = Vec::with_capacity(4096);

    let stream = device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() < output.len() {
                    scratch.resize(output.len(), 0.0);
                }
                let buf = &mut scratch[..output.len()];
                synth.render_interleaved(buf, channels);
                for (o, s) in output.iter_mut().zip(buf.iter()) {
                    *o = T::from_sample(*s);
                }
            },
            err_fn,
            None,
        )
        .map_err(backend)?;

    Ok(stream)
}
