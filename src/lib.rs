//! Reader and post-processor for the EnSight Gold scientific visualisation
//! format: a textual case descriptor plus companion binary geometry and
//! variable payload files describing unstructured finite-element meshes
//! and time-varying field data.
//!
//! [`Case::open`] is the entry point. It parses the case file, then scans
//! (but does not materialise) the geometry for every time step. Call
//! [`Case::load_mesh`] to materialise a time step, [`Case::load_shell`] to
//! reduce it to its renderable outer surface, and
//! [`Case::load_variable_on_shell`] to read and project a field onto that
//! surface.

pub mod case;
pub mod data;
pub mod error;
pub mod flat;
pub mod logging;
pub mod mesh;
pub mod variable;

use std::path::{Path, PathBuf};

use case::model::{CaseDescriptor, VariableDescriptor};
use data::source::FileSource;
use error::{EResult, EncasError};
use logging::Logger;
use mesh::geometry::Mesh;
use mesh::shell::Shell;

/// A parsed case plus everything needed to materialise its meshes, shells,
/// and variables on demand. Not safe to mutate concurrently; independent
/// cases in independent threads are fine.
pub struct Case {
    descriptor: CaseDescriptor,
    logger: Logger,
}

impl Case {
    /// Parse the case file at `path` and scan mesh-info for every time step
    /// of its model geometry.
    pub fn open(path: impl AsRef<Path>, logger: Logger) -> EResult<Self> {
        let descriptor = case::parser::parse(path, &logger)?;
        Ok(Self { descriptor, logger })
    }

    pub fn descriptor(&self) -> &CaseDescriptor {
        &self.descriptor
    }

    /// Number of model geometry time steps this case has mesh-info for.
    pub fn step_count(&self) -> usize {
        self.descriptor.step_count()
    }

    fn model_filename(&self, time_index: usize) -> EResult<PathBuf> {
        let model = self.descriptor.geometry.model.as_ref().ok_or_else(|| {
            rootcause::Report::new(EncasError::format("case has no model geometry"))
        })?;
        let filename = self.expand_pattern(&model.filename, model.time_set, time_index)?;
        Ok(self.descriptor.dirname.join(filename))
    }

    fn expand_pattern(
        &self,
        pattern: &str,
        time_set: Option<i32>,
        time_index: usize,
    ) -> EResult<String> {
        match time_set {
            None => Ok(pattern.to_string()),
            Some(ts_id) => {
                let ts = self.descriptor.time_set(ts_id).ok_or_else(|| {
                    rootcause::Report::new(EncasError::consistency(format!(
                        "time set {ts_id} is not defined"
                    )))
                })?;
                let start = ts.filename_start_number.unwrap_or(0);
                let increment = ts.filename_increment.unwrap_or(1);
                case::wildcard::expand(pattern, start + increment * time_index as i32)
            }
        }
    }

    /// Materialise the mesh for time step `time_index`.
    pub fn load_mesh(&self, time_index: usize) -> EResult<Mesh> {
        let info = self.descriptor.mesh_info.get(time_index).ok_or_else(|| {
            rootcause::Report::new(EncasError::consistency(format!(
                "time index {time_index} has no mesh-info record"
            )))
        })?;
        let path = self.model_filename(time_index)?;
        self.logger.info(format!("loading geometry '{}'", path.display()));
        let source = FileSource::open(&path)?;
        mesh::geometry::load(source.bytes(), info)
    }

    /// Materialise the mesh for `time_index` and reduce it to its outer
    /// surface.
    pub fn load_shell(&self, time_index: usize) -> EResult<Shell> {
        let mesh = self.load_mesh(time_index)?;
        mesh::shell::extract(&mesh)
    }

    /// Materialise the mesh for `time_index` and concatenate it into a
    /// single flat mesh.
    pub fn load_flat_mesh(&self, time_index: usize) -> EResult<flat::FlatMesh> {
        let mesh = self.load_mesh(time_index)?;
        Ok(flat::export(&mesh))
    }

    fn find_variable(&self, description: &str) -> EResult<&VariableDescriptor> {
        self.descriptor.variable(description).ok_or_else(|| {
            rootcause::Report::new(EncasError::consistency(format!(
                "no variable named '{description}'"
            )))
        })
    }

    fn locate_variable_file(
        &self,
        var: &VariableDescriptor,
        time_index: usize,
    ) -> EResult<PathBuf> {
        let filename = self.expand_pattern(&var.filename, var.time_set, time_index)?;
        Ok(self.descriptor.dirname.join(filename))
    }

    /// Load `description` at `time_index` and project it onto `shell`'s
    /// compacted vertices. `mesh` must be the mesh `shell` was extracted
    /// from.
    pub fn load_variable_on_shell(
        &self,
        description: &str,
        time_index: usize,
        mesh: &Mesh,
        shell: &Shell,
    ) -> EResult<Vec<f32>> {
        let var = self.find_variable(description)?;
        let path = self.locate_variable_file(var, time_index)?;
        self.logger.info(format!("loading variable '{}'", path.display()));
        let source = FileSource::open(&path)?;
        let vspace = variable::load_to_vspace(source.bytes(), var.kind, mesh)?;
        let components = variable::component_count(var.kind);
        Ok(variable::project_onto_shell(&vspace, shell, components))
    }

    /// Load `description` at `time_index` as a flat, unaveraged payload
    /// suitable for [`Case::load_flat_mesh`]'s output. Per-element values
    /// are per-cell, not per-vertex; see [`flat`] module docs.
    pub fn load_variable_flat(
        &self,
        description: &str,
        time_index: usize,
        mesh: &Mesh,
    ) -> EResult<Vec<f32>> {
        let var = self.find_variable(description)?;
        let path = self.locate_variable_file(var, time_index)?;
        let source = FileSource::open(&path)?;
        variable::load_flat(source.bytes(), var.kind, mesh)
    }
}

pub use case::model::{GeometryEntry, GeometrySection, TimeSet};
pub use error::EncasError;
