//! Saving and restoring trained networks.
//!
//! The binary snapshot is `bincode` over [`NetworkSnapshot`]; its field
//! order is the wire order:
//!
//! 1. `vocab_size`, `hidden_size`, `batch_size` (u64 each)
//! 2. forget, input, candidate and output gates, each as
//!    input weight, recurrent weight, bias
//! 3. the softmax weight
//! 4. the Adam timestep, Adam hyperparameters, recurrence length and
//!    backpropagation mode
//!
//! Every weight carries its value, gradient, moment vector and infinity
//! norm; a bias carries its value only. A matrix is
//! `rows: u64, columns: u64, data: Vec<f32>` in row-major order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::BpttMode;
use crate::error::LstmError;
use crate::layers::gate::{Gate, GateActivation};
use crate::layers::lstm_cell::LSTMCell;
use crate::layers::weight::Weight;
use crate::matrix::Matrix;
use crate::models::rnn::RNN;
use crate::optimizers::AdamConfig;

/// Serializable version of [`Matrix`] for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SerializableMatrix {
    rows: u64,
    columns: u64,
    data: Vec<f32>,
}

impl From<&Matrix> for SerializableMatrix {
    fn from(matrix: &Matrix) -> Self {
        Self {
            rows: matrix.rows() as u64,
            columns: matrix.columns() as u64,
            data: matrix.to_vec(),
        }
    }
}

impl TryFrom<SerializableMatrix> for Matrix {
    type Error = LstmError;

    fn try_from(stored: SerializableMatrix) -> Result<Self, LstmError> {
        let rows = usize::try_from(stored.rows).map_err(|_| oversized(&stored))?;
        let columns = usize::try_from(stored.columns).map_err(|_| oversized(&stored))?;
        Matrix::from_vec(rows, columns, stored.data)
    }
}

fn oversized(stored: &SerializableMatrix) -> LstmError {
    LstmError::InvalidShape {
        from: (stored.data.len(), 1),
        to: (usize::MAX, usize::MAX),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SerializableWeight {
    value: SerializableMatrix,
    gradient: SerializableMatrix,
    moment_vector: SerializableMatrix,
    infinity_norm: SerializableMatrix,
}

impl From<&Weight> for SerializableWeight {
    fn from(weight: &Weight) -> Self {
        Self {
            value: (&weight.value).into(),
            gradient: (&weight.gradient).into(),
            moment_vector: (&weight.moment_vector).into(),
            infinity_norm: (&weight.infinity_norm).into(),
        }
    }
}

impl TryFrom<SerializableWeight> for Weight {
    type Error = LstmError;

    fn try_from(stored: SerializableWeight) -> Result<Self, LstmError> {
        Weight::from_parts(
            stored.value.try_into()?,
            stored.gradient.try_into()?,
            stored.moment_vector.try_into()?,
            stored.infinity_norm.try_into()?,
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SerializableGate {
    input_weight: SerializableWeight,
    recurrent_weight: SerializableWeight,
    bias: SerializableMatrix,
}

impl From<&Gate> for SerializableGate {
    fn from(gate: &Gate) -> Self {
        Self {
            input_weight: (&gate.input_weight).into(),
            recurrent_weight: (&gate.recurrent_weight).into(),
            bias: (&gate.bias).into(),
        }
    }
}

impl SerializableGate {
    fn into_gate(self, activation: GateActivation) -> Result<Gate, LstmError> {
        Gate::from_parts(
            activation,
            self.input_weight.try_into()?,
            self.recurrent_weight.try_into()?,
            self.bias.try_into()?,
        )
    }
}

/// Complete learned state of an [`RNN`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    vocab_size: u64,
    hidden_size: u64,
    batch_size: u64,
    forget_gate: SerializableGate,
    input_gate: SerializableGate,
    candidate_gate: SerializableGate,
    output_gate: SerializableGate,
    softmax_weight: SerializableWeight,
    timestep: u32,
    adam: AdamConfig,
    recurrence_length: u64,
    bptt: BpttMode,
}

impl From<&RNN> for NetworkSnapshot {
    fn from(network: &RNN) -> Self {
        let cell = &network.cell;
        Self {
            vocab_size: network.vocab_size as u64,
            hidden_size: network.hidden_size as u64,
            batch_size: network.batch_size as u64,
            forget_gate: (&cell.forget_gate).into(),
            input_gate: (&cell.input_gate).into(),
            candidate_gate: (&cell.candidate_gate).into(),
            output_gate: (&cell.output_gate).into(),
            softmax_weight: (&network.softmax_weight).into(),
            timestep: network.timestep(),
            adam: *network.adam_config(),
            recurrence_length: network.recurrence_length as u64,
            bptt: network.bptt_mode(),
        }
    }
}

impl TryFrom<NetworkSnapshot> for RNN {
    type Error = LstmError;

    fn try_from(snapshot: NetworkSnapshot) -> Result<Self, LstmError> {
        let cell = LSTMCell::from_gates(
            snapshot.forget_gate.into_gate(GateActivation::Sigmoid)?,
            snapshot.input_gate.into_gate(GateActivation::Sigmoid)?,
            snapshot.candidate_gate.into_gate(GateActivation::Tanh)?,
            snapshot.output_gate.into_gate(GateActivation::Sigmoid)?,
        )?;

        let declared = (snapshot.vocab_size, snapshot.hidden_size);
        let actual = (cell.input_size as u64, cell.hidden_size as u64);
        if declared != actual {
            return Err(LstmError::InvalidShape {
                from: (cell.input_size, cell.hidden_size),
                to: (snapshot.vocab_size as usize, snapshot.hidden_size as usize),
            });
        }

        RNN::from_parts(
            cell,
            snapshot.softmax_weight.try_into()?,
            stored_size(snapshot.batch_size, "batch_size")?,
            stored_size(snapshot.recurrence_length, "recurrence_length")?,
            snapshot.adam,
            snapshot.bptt,
            snapshot.timestep,
        )
    }
}

fn stored_size(value: u64, name: &str) -> Result<usize, LstmError> {
    usize::try_from(value)
        .map_err(|_| LstmError::InvalidConfig(format!("{} {} does not fit this platform", name, value)))
}

/// Model metadata for tracking training information
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    pub total_epochs: usize,
    pub final_loss: Option<f32>,
    pub description: Option<String>,
}

/// Complete saved model including network and metadata
#[derive(Serialize, Deserialize)]
pub struct SavedModel {
    pub network: NetworkSnapshot,
    pub metadata: ModelMetadata,
}

/// Errors that can occur during model persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid model: {0}")]
    Model(#[from] LstmError),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        PersistenceError::Serialization(error.to_string())
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(error: bincode::Error) -> Self {
        PersistenceError::Serialization(error.to_string())
    }
}

impl RNN {
    /// Writes the binary snapshot to any byte sink.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), PersistenceError> {
        bincode::serialize_into(writer, &NetworkSnapshot::from(self))?;
        Ok(())
    }

    /// Reads a network written by [`RNN::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, PersistenceError> {
        let snapshot: NetworkSnapshot = bincode::deserialize_from(reader)?;
        Ok(RNN::try_from(snapshot)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, PersistenceError> {
        Self::read_from(&mut bytes)
    }
}

/// Model persistence operations
pub struct ModelPersistence;

impl ModelPersistence {
    /// Save model to JSON format (human-readable)
    pub fn save_to_json<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, model)?;
        Ok(())
    }

    /// Load model from JSON format
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Save model to binary format (compact and fast)
    pub fn save_to_binary<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, model)?;
        writer.flush()?;
        Ok(())
    }

    /// Load model from binary format
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Create a model with metadata
    pub fn create_saved_model(
        network: &RNN,
        model_name: String,
        total_epochs: usize,
        final_loss: Option<f32>,
        description: Option<String>,
    ) -> SavedModel {
        let metadata = ModelMetadata {
            model_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            vocab_size: network.vocab_size,
            hidden_size: network.hidden_size,
            batch_size: network.batch_size,
            total_epochs,
            final_loss,
            description,
        };

        SavedModel {
            network: network.into(),
            metadata,
        }
    }
}

/// Convenience trait for easy model saving/loading
pub trait PersistentModel {
    /// Save model to file (format determined by file extension)
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError>;

    /// Load model from file (format determined by file extension)
    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError>
    where
        Self: Sized;
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("json")
}

impl PersistentModel for RNN {
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError> {
        let saved_model = SavedModel {
            network: self.into(),
            metadata,
        };

        if is_json(path.as_ref()) {
            ModelPersistence::save_to_json(&saved_model, path)
        } else {
            ModelPersistence::save_to_binary(&saved_model, path)
        }
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError> {
        let saved_model = if is_json(path.as_ref()) {
            ModelPersistence::load_from_json(path)?
        } else {
            ModelPersistence::load_from_binary(path)?
        };

        Ok((RNN::try_from(saved_model.network)?, saved_model.metadata))
    }
}
