//! Tagged binary serialization for trainable models.
//!
//! Layout: magic bytes, format version, game tag, backend byte, a layer
//! descriptor table, then the parameter tensors as little-endian `f32`
//! runs in layer order. Saving always goes through the CPU representation;
//! loading yields CPU tensors that the caller may swap afterwards.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::game::Game;
use crate::model::base::BaseModel;
use crate::model::Backend;
use crate::{Error, Result};

const MAGIC: [u8; 4] = *b"SZMF";
const FORMAT_VERSION: u16 = 1;

/// Shape and regularization flag of one parameter tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// Layer kind tag, e.g. `"dense"`.
    pub kind: String,

    /// Tensor dimensions; their product is the tensor length.
    pub shape: Vec<usize>,

    /// Whether the tensor participates in L2 regularization.
    pub regularize: bool,
}

impl LayerDescriptor {
    pub fn tensor_len(&self) -> usize {
        self.shape.iter().product()
    }
}

/// A deserialized model: header plus parameter tensors.
///
/// Rebuild a live model with [`BaseModel::restore`] or a net-specific
/// constructor such as [`LinearNet::from_saved`](crate::model::LinearNet::from_saved).
#[derive(Debug, Clone)]
pub struct SavedModel {
    pub version: u16,
    pub game: String,
    pub backend: Backend,
    pub layers: Vec<LayerDescriptor>,
    pub tensors: Vec<Vec<f32>>,
}

/// Writes `model` in the tagged binary format.
pub fn save_model<G: Game, W: Write>(model: &BaseModel<G>, writer: &mut W) -> Result<()> {
    // Serialize the cpu representation regardless of where the model lives.
    let cpu;
    let net = if model.net().backend() == Backend::Gpu {
        cpu = model.net().swap()?;
        &*cpu
    } else {
        model.net()
    };

    writer.write_all(&MAGIC)?;
    writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    write_string(writer, G::NAME)?;
    writer.write_u8(0)?; // cpu backend

    let layers = net.layers();
    writer.write_u32::<LittleEndian>(layers.len() as u32)?;
    for layer in &layers {
        write_string(writer, &layer.kind)?;
        writer.write_u8(layer.shape.len() as u8)?;
        for &dim in &layer.shape {
            writer.write_u32::<LittleEndian>(dim as u32)?;
        }
        writer.write_u8(layer.regularize as u8)?;
    }

    for tensor in net.tensors() {
        for value in tensor {
            writer.write_f32::<LittleEndian>(value)?;
        }
    }
    Ok(())
}

/// Reads a model saved with [`save_model`].
pub fn load_saved<R: Read>(reader: &mut R) -> Result<SavedModel> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(Error::Load("not a serialized model".into()));
    }
    let version = reader.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(Error::Load(format!(
            "unsupported format version {}",
            version
        )));
    }
    let game = read_string(reader)?;
    let backend = match reader.read_u8()? {
        0 => Backend::Cpu,
        1 => Backend::Gpu,
        other => return Err(Error::Load(format!("unknown backend tag {}", other))),
    };

    let layer_count = reader.read_u32::<LittleEndian>()? as usize;
    let mut layers = Vec::with_capacity(layer_count);
    for _ in 0..layer_count {
        let kind = read_string(reader)?;
        let rank = reader.read_u8()? as usize;
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            shape.push(reader.read_u32::<LittleEndian>()? as usize);
        }
        let regularize = reader.read_u8()? != 0;
        layers.push(LayerDescriptor {
            kind,
            shape,
            regularize,
        });
    }

    let mut tensors = Vec::with_capacity(layers.len());
    for layer in &layers {
        let mut tensor = vec![0.0; layer.tensor_len()];
        reader.read_f32_into::<LittleEndian>(&mut tensor)?;
        tensors.push(tensor);
    }

    Ok(SavedModel {
        version,
        game,
        backend,
        layers,
        tensors,
    })
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u16::<LittleEndian>(value.len() as u16)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u16::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| Error::Load("malformed string in header".into()))
}
