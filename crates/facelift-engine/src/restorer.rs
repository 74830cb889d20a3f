//! GFPGAN face restoration over whole frames.
//!
//! The pipeline hands us one RGB frame at a time and expects a restored,
//! upscaled frame back. The ONNX graph takes a 1x3x512x512 tensor normalized
//! to [-1,1] and returns the enhanced image in the same layout.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::RgbImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{EngineError, EngineResult};

/// Side length of the model's square input.
const MODEL_INPUT_SIZE: u32 = 512;

/// GFPGAN network variant baked into the exported graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkVariant {
    /// The `clean` architecture without StyleGAN channel splitting.
    #[default]
    Clean,
    /// Original architecture with colorization head.
    Original,
}

/// Fixed restoration parameters.
///
/// These mirror the upstream model's invocation: 2x upscale, clean variant,
/// alignment off, whole-frame detection, paste-back enabled.
#[derive(Debug, Clone, Copy)]
pub struct RestorerOptions {
    /// Output scale factor relative to the input frame.
    pub upscale: u32,
    /// Network variant.
    pub variant: NetworkVariant,
    /// Whether input faces are pre-aligned crops. Always false here; jobs
    /// send raw video frames.
    pub aligned: bool,
    /// Restrict detection to the center face only.
    pub only_center_face: bool,
    /// Paste the restored region back onto the full frame.
    pub paste_back: bool,
}

impl Default for RestorerOptions {
    fn default() -> Self {
        Self {
            upscale: 2,
            variant: NetworkVariant::Clean,
            aligned: false,
            only_center_face: false,
            paste_back: true,
        }
    }
}

/// Black-box per-frame restoration transform.
pub trait FaceRestorer: Send + Sync {
    /// Restore one frame, returning the enhanced (and upscaled) frame.
    fn restore(&self, frame: &RgbImage) -> EngineResult<RgbImage>;

    /// Output scale factor relative to the input frame.
    fn upscale(&self) -> u32;
}

/// ONNX Runtime-backed GFPGAN restorer.
#[derive(Debug)]
pub struct GfpganRestorer {
    session: Mutex<Session>,
    options: RestorerOptions,
    device: Device,
}

impl GfpganRestorer {
    /// Load the model from `model_path` for the given device.
    pub fn load(
        model_path: impl AsRef<Path>,
        device: Device,
        options: RestorerOptions,
    ) -> EngineResult<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(EngineError::WeightsNotFound(model_path.to_path_buf()));
        }

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| EngineError::model_load_failed(format!("read model file: {e}")))?;

        let mut builder = Session::builder()
            .map_err(|e| EngineError::model_load_failed(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::model_load_failed(format!("ORT opt level: {e}")))?;

        #[cfg(feature = "cuda")]
        let builder = if device == Device::Cuda {
            builder
                .with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default().build(),
                ])
                .map_err(|e| EngineError::model_load_failed(format!("ORT CUDA EP: {e}")))?
        } else {
            builder
        };

        let session = builder
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| EngineError::model_load_failed(format!("ORT load model: {e}")))?;

        info!(
            "Loaded GFPGAN ({:?}) from {} on {} (upscale {}x)",
            options.variant,
            model_path.display(),
            device,
            options.upscale
        );

        Ok(Self {
            session: Mutex::new(session),
            options,
            device,
        })
    }

    /// Device the session was created for.
    pub fn device(&self) -> Device {
        self.device
    }
}

impl FaceRestorer for GfpganRestorer {
    fn restore(&self, frame: &RgbImage) -> EngineResult<RgbImage> {
        let (src_w, src_h) = frame.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(EngineError::InvalidFrame("empty frame".to_string()));
        }

        // Resize whole frame to the model's square input.
        let resized = image::imageops::resize(
            frame,
            MODEL_INPUT_SIZE,
            MODEL_INPUT_SIZE,
            FilterType::Triangle,
        );

        let tensor = frame_to_tensor(&resized)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::inference_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| EngineError::inference_failed(format!("ORT run failed: {e}")))?;

        let output = outputs
            .get("output")
            .ok_or_else(|| EngineError::inference_failed("ORT returned no outputs"))?;

        let restored = tensor_to_frame(output)?;
        drop(outputs);

        // Paste-back at the requested upscale: the enhanced full frame is
        // scaled to upscale x the source geometry.
        let out_w = src_w * self.options.upscale;
        let out_h = src_h * self.options.upscale;
        debug!("Restored frame {}x{} -> {}x{}", src_w, src_h, out_w, out_h);
        Ok(image::imageops::resize(
            &restored,
            out_w,
            out_h,
            FilterType::Triangle,
        ))
    }

    fn upscale(&self) -> u32 {
        self.options.upscale
    }
}

/// Convert an RGB8 image to a (1,3,H,W) ORT tensor normalized to [-1,1].
fn frame_to_tensor(img: &RgbImage) -> EngineResult<Value> {
    let (w, h) = img.dimensions();
    let data = chw_normalize(img);
    let shape = vec![1usize, 3, h as usize, w as usize];
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| EngineError::inference_failed(format!("ORT tensor: {e}")))
}

/// HWC u8 -> CHW f32 in [-1,1].
fn chw_normalize(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let raw = img.as_raw();
    let mut chw = Vec::with_capacity((w * h * 3) as usize);
    for c in 0..3usize {
        for y in 0..h as usize {
            for x in 0..w as usize {
                let idx = (y * w as usize + x) * 3 + c;
                let v = raw[idx] as f32 / 255.0;
                chw.push(v * 2.0 - 1.0);
            }
        }
    }
    chw
}

/// Convert a (1,3,H,W) or (3,H,W) model output in [-1,1] back to RGB8.
fn tensor_to_frame(output: &Value) -> EngineResult<RgbImage> {
    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| EngineError::inference_failed(format!("ORT extract: {e}")))?;

    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    let (c, h, w) = match dims.as_slice() {
        [1, c, h, w] => (*c, *h, *w),
        [c, h, w] => (*c, *h, *w),
        _ => {
            return Err(EngineError::inference_failed(format!(
                "unexpected output shape: {:?}",
                dims
            )))
        }
    };

    if c != 3 || data.len() < c * h * w {
        return Err(EngineError::inference_failed(format!(
            "expected 3-channel output, got shape {:?}",
            dims
        )));
    }

    chw_denormalize(data, w as u32, h as u32)
}

/// CHW f32 in [-1,1] -> HWC u8 image.
fn chw_denormalize(data: &[f32], w: u32, h: u32) -> EngineResult<RgbImage> {
    let plane = (w * h) as usize;
    let mut img = RgbImage::new(w, h);
    for y in 0..h as usize {
        for x in 0..w as usize {
            let i = y * w as usize + x;
            let px = image::Rgb([
                to_u8(data[i]),
                to_u8(data[plane + i]),
                to_u8(data[2 * plane + i]),
            ]);
            img.put_pixel(x as u32, y as u32, px);
        }
    }
    Ok(img)
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (((v + 1.0) / 2.0).clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_model_invocation() {
        let opts = RestorerOptions::default();
        assert_eq!(opts.upscale, 2);
        assert_eq!(opts.variant, NetworkVariant::Clean);
        assert!(!opts.aligned);
        assert!(!opts.only_center_face);
        assert!(opts.paste_back);
    }

    #[test]
    fn test_chw_normalize_range_and_layout() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgb([0, 128, 255]));
        img.put_pixel(1, 0, image::Rgb([255, 0, 0]));

        let chw = chw_normalize(&img);
        assert_eq!(chw.len(), 6);
        // R plane first: pixel (0,0) red channel 0 -> -1.0
        assert!((chw[0] + 1.0).abs() < 1e-6);
        // pixel (1,0) red 255 -> 1.0
        assert!((chw[1] - 1.0).abs() < 1e-6);
        // B plane last: pixel (0,0) blue 255 -> 1.0
        assert!((chw[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_denormalize_roundtrip() {
        let mut img = RgbImage::new(3, 2);
        for (i, px) in img.pixels_mut().enumerate() {
            *px = image::Rgb([(i * 40) as u8, (i * 20) as u8, (255 - i * 30) as u8]);
        }

        let chw = chw_normalize(&img);
        let back = chw_denormalize(&chw, 3, 2).unwrap();
        for (a, b) in img.pixels().zip(back.pixels()) {
            for ch in 0..3 {
                assert!((a.0[ch] as i16 - b.0[ch] as i16).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_to_u8_clamps() {
        assert_eq!(to_u8(-2.0), 0);
        assert_eq!(to_u8(2.0), 255);
        assert_eq!(to_u8(-1.0), 0);
        assert_eq!(to_u8(1.0), 255);
    }

    #[test]
    fn test_load_missing_weights() {
        let err = GfpganRestorer::load(
            "/nonexistent/GFPGANv1.4.onnx",
            Device::Cpu,
            RestorerOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::WeightsNotFound(_)));
    }
}
