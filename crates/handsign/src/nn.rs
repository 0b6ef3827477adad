//! Neural Network inference.
//!
//! Networks are loaded from ONNX files and run on the CPU with [`tract_onnx`].

use std::{ops::RangeInclusive, path::Path, sync::Arc};

use anyhow::{bail, Context};
use tract_onnx::prelude::{
    tract_ndarray::ArrayViewD, Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, TValue,
    Tensor, TypedFact, TypedOp,
};

use crate::{image::Image, rect::RotatedRect, resolution::Resolution};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures. Inference only
/// needs shared access, so one network can serve any number of threads at once.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model '{}'", path.display()))?;
        Self::from_onnx(&model_data)
            .with_context(|| format!("failed to load model '{}'", path.display()))
    }

    /// Loads and optimizes a pre-trained model from an in-memory ONNX file.
    ///
    /// Returns an error if the network data is malformed, if the network data is incomplete, or if
    /// the network uses unimplemented operations.
    pub fn from_onnx(mut raw: &[u8]) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut raw)?
            .into_optimized()?;
        let model = SimplePlan::new(graph)?;
        Ok(Self(Arc::new(model)))
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.model().outputs.len()
    }

    /// Returns the concrete tensor shape of input `index`.
    pub fn input_shape(&self, index: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.0.model().input_fact(index)?;
        match fact.shape.as_concrete() {
            Some(shape) => Ok(shape.to_vec()),
            None => bail!("network input {} has a symbolic shape: {:?}", index, fact.shape),
        }
    }

    /// Runs the network on a list of input tensors, returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: Vec<Tensor>) -> anyhow::Result<Outputs> {
        let inputs = inputs
            .into_iter()
            .map(|t| TValue::from_const(Arc::new(t)))
            .collect();
        let outputs = self.0.run(inputs)?;
        Ok(Outputs {
            inner: outputs.into_iter().map(|v| v.into_tensor()).collect(),
        })
    }
}

/// A convolutional neural network (CNN) that operates on image data.
///
/// Like the underlying [`NeuralNetwork`], this is a cheaply [`Clone`]able handle.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    input_res: Resolution,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input, an `[N, C, H, W]` tensor with a single RGB image
    /// (`N = 1`, `C = 3`).
    pub fn new(nn: NeuralNetwork, color_mapper: ColorMapper) -> anyhow::Result<Self> {
        if nn.num_inputs() != 1 {
            bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                nn.num_inputs(),
            );
        }

        let tensor_shape = nn.input_shape(0)?;
        let (w, h) = match &tensor_shape[..] {
            [1, 3, h, w] => (*w, *h),
            _ => bail!("invalid model input shape for NCHW CNN: {:?}", tensor_shape),
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Self {
            nn,
            input_res: Resolution::new(w, h),
            color_mapper,
        })
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on a region of `image`, returning the estimated outputs.
    ///
    /// The region is sampled to create the network's input tensor. If its aspect ratio does not
    /// match the network's input aspect ratio, the image will be stretched.
    pub fn estimate(&self, image: &Image, region: &RotatedRect) -> anyhow::Result<Outputs> {
        let tensor = self.input_tensor(image, region)?;
        self.nn.estimate(vec![tensor])
    }

    fn input_tensor(&self, image: &Image, region: &RotatedRect) -> anyhow::Result<Tensor> {
        let (h, w) = (
            self.input_res.height() as usize,
            self.input_res.width() as usize,
        );
        let plane = h * w;
        let mut data = vec![0.0; 3 * plane];
        for y in 0..h {
            let v = (y as f32 + 0.5) / h as f32;
            for x in 0..w {
                let u = (x as f32 + 0.5) / w as f32;
                let rgb = self.color_mapper.map(image.sample(region, u, v));
                for (c, value) in rgb.into_iter().enumerate() {
                    data[c * plane + y * w + x] = value;
                }
            }
        }

        Ok(Tensor::from_shape(&[1, 3, h, w], &data)?)
    }
}

/// Maps 8-bit color channels to the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Creates a simple color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range. The MediaPipe hand networks take non-linear sRGB inputs.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, rgb: [u8; 3]) -> [f32; 3] {
        let start = *self.target_range.start();
        let end = *self.target_range.end();

        let adjust_range = (end - start) / 255.0;
        rgb.map(|col| col as f32 * adjust_range + start)
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: Vec<Tensor>,
}

impl Outputs {
    /// Creates an output list from raw tensors.
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self { inner: tensors }
    }

    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns a view of output `index` as `f32`s, checking it against the `expected` shape.
    ///
    /// Returns an error if there is no such output, if it has a different shape, or if it does not
    /// contain `f32` values.
    pub fn view(&self, index: usize, expected: &[usize]) -> anyhow::Result<ArrayViewD<'_, f32>> {
        let tensor = self
            .inner
            .get(index)
            .with_context(|| format!("network has no output {index} (got {})", self.len()))?;
        if tensor.shape() != expected {
            bail!(
                "network output {} has shape {:?}, expected {:?}",
                index,
                tensor.shape(),
                expected
            );
        }

        Ok(tensor.to_array_view::<f32>()?)
    }
}
