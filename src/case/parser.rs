//! Section-driven textual case-file parser.
//!
//! The grammar has no nested structure: a handful of uppercase section
//! headers, and within each section `key: value` entries whose value is a
//! whitespace-separated token list. Several entries carry optional leading
//! integers that make the token count alone ambiguous; disambiguation uses
//! the "leading digits mean an integer positional" rule on a per-entry
//! basis (see the GEOMETRY and VARIABLE handlers below).

use std::path::{Path, PathBuf};

use crate::case::model::{
    CaseDescriptor, GeometryEntry, GeometrySection, TimeSet, VariableDescriptor, VariableKind,
};
use crate::case::wildcard;
use crate::data::reader::ByteReader;
use crate::data::source::FileSource;
use crate::data::strutil::{is_all_digits, parse_f32, parse_i32, split_key_value, split_whitespace, trim};
use crate::error::{EResult, EncasError};
use crate::logging::Logger;
use crate::mesh::info::{self, MeshInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Format,
    Geometry,
    Variable,
    Time,
    File,
    Material,
}

fn detect_section(line: &[u8]) -> Option<Section> {
    match line {
        b"FORMAT" => Some(Section::Format),
        b"GEOMETRY" => Some(Section::Geometry),
        b"VARIABLE" => Some(Section::Variable),
        b"TIME" => Some(Section::Time),
        b"FILE" => Some(Section::File),
        b"MATERIAL" => Some(Section::Material),
        _ => None,
    }
}

/// Parse the case file at `path`, then scan mesh-info for every time step of
/// its model geometry.
pub fn parse(path: impl AsRef<Path>, logger: &Logger) -> EResult<CaseDescriptor> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            rootcause::Report::new(EncasError::NotFound {
                what: "case file",
                path: path.display().to_string(),
            })
        } else {
            rootcause::Report::new(EncasError::Io(e))
        }
    })?;
    let dirname = path.parent().map(PathBuf::from).unwrap_or_default();

    let mut section = Section::None;
    let mut geometry = GeometrySection::default();
    let mut variables = Vec::new();
    let mut time_sets: Vec<TimeSet> = Vec::new();
    let mut current_time: Option<TimeSet> = None;
    let mut pending_values_needed: usize = 0;
    let mut format_seen = false;

    let mut reader = ByteReader::new(&bytes);
    while !reader.is_eof() {
        let raw_line = reader.read_line();
        let line = trim(raw_line);
        if line.is_empty() {
            continue;
        }

        if matches!(section, Section::Time)
            && pending_values_needed > 0
            && split_key_value(line).is_none()
        {
            let ts = current_time.as_mut().ok_or_else(|| {
                rootcause::Report::new(EncasError::format(
                    "'time values' continuation line appears outside any open 'time set'",
                ))
            })?;
            for tok in split_whitespace(line) {
                if pending_values_needed == 0 {
                    break;
                }
                let v = parse_f32(tok).ok_or_else(|| {
                    rootcause::Report::new(EncasError::format(
                        "expected a numeric continuation of 'time values'",
                    ))
                })?;
                ts.time_values.push(v);
                pending_values_needed -= 1;
            }
            continue;
        }

        if let Some(new_section) = detect_section(line) {
            if !matches!(new_section, Section::Time) {
                if let Some(ts) = current_time.take() {
                    time_sets.push(ts);
                }
                pending_values_needed = 0;
            }
            section = new_section;
            continue;
        }

        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        let tokens = split_whitespace(value);

        match section {
            Section::Format => {
                if key == b"type" {
                    if tokens.as_slice() == [b"ensight".as_slice(), b"gold".as_slice()] {
                        format_seen = true;
                    } else {
                        return Err(rootcause::Report::new(EncasError::format(
                            "unsupported FORMAT type; only 'ensight gold' is implemented",
                        )));
                    }
                }
            }
            Section::Geometry => parse_geometry_entry(key, &tokens, &mut geometry)?,
            Section::Variable => parse_variable_entry(key, &tokens, &mut variables)?,
            Section::Time => parse_time_entry(
                key,
                &tokens,
                &mut current_time,
                &mut time_sets,
                &mut pending_values_needed,
            )?,
            Section::File | Section::Material | Section::None => {}
        }
    }
    if let Some(ts) = current_time.take() {
        time_sets.push(ts);
    }

    if !format_seen {
        return Err(rootcause::Report::new(EncasError::format(
            "case file has no 'FORMAT' section with 'type: ensight gold'",
        )));
    }

    let model = geometry
        .model
        .clone()
        .ok_or_else(|| rootcause::Report::new(EncasError::format("case file has no GEOMETRY model entry")))?;

    let mesh_info = scan_model_mesh_info(&model, &dirname, &time_sets, logger)?;

    Ok(CaseDescriptor {
        dirname,
        geometry,
        variables,
        time_sets,
        mesh_info,
    })
}

fn parse_geometry_entry(
    key: &[u8],
    tokens: &[&[u8]],
    geometry: &mut GeometrySection,
) -> EResult<()> {
    let entry = parse_geometry_tokens(tokens)?;
    match key {
        b"model" => geometry.model = Some(entry),
        b"measured" => geometry.measured = Some(entry),
        b"match" => geometry.r#match = Some(entry),
        b"boundary" => geometry.boundary = Some(entry),
        _ => {}
    }
    Ok(())
}

/// `[ts] [fs] filename [change_coords_only]`, 1-4 tokens.
fn parse_geometry_tokens(tokens: &[&[u8]]) -> EResult<GeometryEntry> {
    let (time_set, file_set, filename, change_coords_only) = match tokens.len() {
        1 => (None, None, tokens[0], false),
        2 => {
            if is_all_digits(tokens[0]) {
                (parse_i32(tokens[0]), None, tokens[1], false)
            } else {
                (None, None, tokens[0], tokens[1] == b"change_coords_only")
            }
        }
        3 => {
            if is_all_digits(tokens[1]) {
                (parse_i32(tokens[0]), parse_i32(tokens[1]), tokens[2], false)
            } else {
                (
                    parse_i32(tokens[0]),
                    None,
                    tokens[1],
                    tokens[2] == b"change_coords_only",
                )
            }
        }
        4 => (
            parse_i32(tokens[0]),
            parse_i32(tokens[1]),
            tokens[2],
            tokens[3] == b"change_coords_only",
        ),
        _ => {
            return Err(rootcause::Report::new(EncasError::format(
                "GEOMETRY entry has an unexpected number of tokens",
            )));
        }
    };
    Ok(GeometryEntry {
        filename: String::from_utf8_lossy(filename).into_owned(),
        time_set,
        file_set,
        change_coords_only,
    })
}

fn parse_variable_entry(
    key: &[u8],
    tokens: &[&[u8]],
    variables: &mut Vec<VariableDescriptor>,
) -> EResult<()> {
    let kind = match key {
        b"scalar per node" => VariableKind::ScalarPerNode,
        b"vector per node" => VariableKind::VectorPerNode,
        b"scalar per element" => VariableKind::ScalarPerElement,
        b"vector per element" => VariableKind::VectorPerElement,
        b"constant per case"
        | b"constant per case file"
        | b"tensor symm per node"
        | b"tensor asymm per node"
        | b"tensor symm per element"
        | b"tensor asymm per element"
        | b"scalar per measured node"
        | b"vector per measured node"
        | b"complex scalar per node"
        | b"complex vector per node"
        | b"complex scalar per element"
        | b"complex vector per element" => {
            return Err(rootcause::Report::new(EncasError::unsupported(format!(
                "variable type '{}' is not implemented",
                String::from_utf8_lossy(key)
            ))));
        }
        _ => return Ok(()),
    };

    if tokens.len() < 2 || tokens.len() > 4 {
        return Err(rootcause::Report::new(EncasError::format(
            "VARIABLE entry has an unexpected number of tokens",
        )));
    }

    let (time_set, file_set, description, filename) = match tokens.len() {
        2 => (None, None, tokens[0], tokens[1]),
        3 => {
            if is_all_digits(tokens[0]) {
                (parse_i32(tokens[0]), None, tokens[1], tokens[2])
            } else {
                return Err(rootcause::Report::new(EncasError::format(
                    "VARIABLE entry with 3 tokens must lead with a time-set id",
                )));
            }
        }
        4 => (parse_i32(tokens[0]), parse_i32(tokens[1]), tokens[2], tokens[3]),
        _ => unreachable!(),
    };

    variables.push(VariableDescriptor {
        kind,
        description: String::from_utf8_lossy(description).into_owned(),
        filename: String::from_utf8_lossy(filename).into_owned(),
        time_set,
        file_set,
    });
    Ok(())
}

fn parse_time_entry(
    key: &[u8],
    tokens: &[&[u8]],
    current_time: &mut Option<TimeSet>,
    time_sets: &mut Vec<TimeSet>,
    pending_values_needed: &mut usize,
) -> EResult<()> {
    if key == b"time set" {
        if let Some(ts) = current_time.take() {
            time_sets.push(ts);
        }
        let id = tokens
            .first()
            .and_then(|t| parse_i32(t))
            .ok_or_else(|| rootcause::Report::new(EncasError::format("'time set' entry missing an integer id")))?;
        let description = tokens.get(1).map(|t| String::from_utf8_lossy(t).into_owned());
        *current_time = Some(TimeSet {
            id,
            description,
            ..Default::default()
        });
        *pending_values_needed = 0;
        return Ok(());
    }

    let ts = current_time.as_mut().ok_or_else(|| {
        rootcause::Report::new(EncasError::format(format!(
            "TIME entry '{}' appears before any 'time set' header",
            String::from_utf8_lossy(key)
        )))
    })?;

    match key {
        b"number of steps" => {
            let n = tokens.first().and_then(|t| parse_i32(t)).ok_or_else(|| {
                rootcause::Report::new(EncasError::format("'number of steps' is missing an integer"))
            })?;
            ts.number_of_steps = Some(n as u32);
        }
        b"filename start number" => {
            ts.filename_start_number = tokens.first().and_then(|t| parse_i32(t));
        }
        b"filename increment" => {
            ts.filename_increment = tokens.first().and_then(|t| parse_i32(t));
        }
        b"time values" => {
            let total = ts.number_of_steps.ok_or_else(|| {
                rootcause::Report::new(EncasError::format(
                    "'time values' given before 'number of steps'",
                ))
            })? as usize;
            for tok in tokens {
                let v = parse_f32(tok).ok_or_else(|| {
                    rootcause::Report::new(EncasError::format("expected a numeric time value"))
                })?;
                ts.time_values.push(v);
            }
            *pending_values_needed = total.saturating_sub(ts.time_values.len());
        }
        _ => {}
    }
    Ok(())
}

fn scan_model_mesh_info(
    model: &GeometryEntry,
    dirname: &Path,
    time_sets: &[TimeSet],
    logger: &Logger,
) -> EResult<Vec<MeshInfo>> {
    let filenames = expand_model_filenames(model, time_sets)?;
    let mut infos = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let path = dirname.join(&filename);
        logger.info(format!("scanning geometry '{}'", path.display()));
        let source = FileSource::open(&path)?;
        infos.push(info::scan(source.bytes())?);
    }
    Ok(infos)
}

fn expand_model_filenames(model: &GeometryEntry, time_sets: &[TimeSet]) -> EResult<Vec<String>> {
    match model.time_set {
        None => Ok(vec![model.filename.clone()]),
        Some(ts_id) => {
            let ts = time_sets.iter().find(|t| t.id == ts_id).ok_or_else(|| {
                rootcause::Report::new(EncasError::consistency(format!(
                    "GEOMETRY model references time set {ts_id} which is not defined"
                )))
            })?;
            let n = ts.number_of_steps.unwrap_or(ts.time_values.len() as u32) as usize;
            let start = ts.filename_start_number.unwrap_or(0);
            let increment = ts.filename_increment.unwrap_or(1);
            (0..n)
                .map(|i| wildcard::expand(&model.filename, start + increment * i as i32))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pad80(s: &[u8]) -> Vec<u8> {
        let mut v = s.to_vec();
        v.resize(80, 0);
        v
    }

    fn write_tetra_geometry(path: &Path) {
        let mut data = Vec::new();
        data.extend(pad80(b"C Binary"));
        data.extend(pad80(b"desc1"));
        data.extend(pad80(b"desc2"));
        data.extend(pad80(b"node id off"));
        data.extend(pad80(b"element id off"));
        data.extend(pad80(b"part"));
        data.extend(1i32.to_le_bytes());
        data.extend(pad80(b"part description"));
        data.extend(pad80(b"coordinates"));
        data.extend(4i32.to_le_bytes());
        for v in [0.0f32, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0] {
            data.extend(v.to_le_bytes());
        }
        data.extend(pad80(b"tetra4"));
        data.extend(1i32.to_le_bytes());
        for v in [1i32, 2, 3, 4] {
            data.extend(v.to_le_bytes());
        }
        std::fs::File::create(path).unwrap().write_all(&data).unwrap();
    }

    #[test]
    fn parses_minimal_case_with_one_geometry_step() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let geo_path = dir.join("cube.geo");
        write_tetra_geometry(&geo_path);
        let case_path = dir.join("cube.case");
        std::fs::write(
            &case_path,
            b"FORMAT\ntype: ensight gold\nGEOMETRY\nmodel: cube.geo\n",
        )
        .unwrap();

        let descriptor = parse(&case_path, &Logger::silent()).unwrap();
        assert_eq!(descriptor.dirname, dir);
        assert!(descriptor.time_sets.is_empty());
        assert_eq!(descriptor.mesh_info.len(), 1);
        assert_eq!(descriptor.mesh_info[0].parts.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_model_geometry_is_rejected() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_nomodel_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let case_path = dir.join("cube.case");
        std::fs::write(&case_path, b"FORMAT\ntype: ensight gold\n").unwrap();

        assert!(parse(&case_path, &Logger::silent()).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn time_set_wildcard_expands_three_steps() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_ts_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for n in [1, 3, 5] {
            write_tetra_geometry(&dir.join(format!("cube{n:03}.geo")));
        }
        let case_path = dir.join("cube.case");
        std::fs::write(
            &case_path,
            concat!(
                "FORMAT\n",
                "type: ensight gold\n",
                "GEOMETRY\n",
                "model: 1 cube***.geo\n",
                "TIME\n",
                "time set: 1\n",
                "number of steps: 3\n",
                "filename start number: 1\n",
                "filename increment: 2\n",
                "time values: 0.0 0.1 0.2\n",
            ),
        )
        .unwrap();

        let descriptor = parse(&case_path, &Logger::silent()).unwrap();
        assert_eq!(descriptor.time_sets.len(), 1);
        assert_eq!(descriptor.time_sets[0].time_values, vec![0.0, 0.1, 0.2]);
        assert_eq!(descriptor.mesh_info.len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unsupported_variable_type_is_rejected() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_unsup_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_tetra_geometry(&dir.join("cube.geo"));
        let case_path = dir.join("cube.case");
        std::fs::write(
            &case_path,
            concat!(
                "FORMAT\n",
                "type: ensight gold\n",
                "GEOMETRY\n",
                "model: cube.geo\n",
                "VARIABLE\n",
                "constant per case: pi 3.14\n",
            ),
        )
        .unwrap();

        assert!(parse(&case_path, &Logger::silent()).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn time_values_split_across_continuation_lines() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_cont_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_tetra_geometry(&dir.join("cube.geo"));
        let case_path = dir.join("cube.case");
        std::fs::write(
            &case_path,
            concat!(
                "FORMAT\n",
                "type: ensight gold\n",
                "GEOMETRY\n",
                "model: cube.geo\n",
                "TIME\n",
                "time set: 1\n",
                "number of steps: 4\n",
                "time values: 0.0 0.1\n",
                "0.2 0.3\n",
            ),
        )
        .unwrap();

        let descriptor = parse(&case_path, &Logger::silent()).unwrap();
        assert_eq!(descriptor.time_sets[0].time_values, vec![0.0, 0.1, 0.2, 0.3]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn pending_time_values_interrupted_by_another_section_does_not_panic() {
        let dir = std::env::temp_dir().join(format!("encas_case_test_interrupt_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_tetra_geometry(&dir.join("cube.geo"));
        let case_path = dir.join("cube.case");
        // First TIME section leaves `pending_values_needed == 1` (3 steps, 2 values
        // given), then a FILE section intervenes, then a second TIME section opens
        // with a bare continuation line before any `time set:` entry. The stray
        // continuation has no open time set to attach to; this must be handled
        // gracefully (ignored) rather than panicking.
        std::fs::write(
            &case_path,
            concat!(
                "FORMAT\n",
                "type: ensight gold\n",
                "GEOMETRY\n",
                "model: cube.geo\n",
                "TIME\n",
                "time set: 1\n",
                "number of steps: 3\n",
                "time values: 1.0 2.0\n",
                "FILE\n",
                "TIME\n",
                "3.0\n",
                "time set: 2\n",
                "number of steps: 1\n",
                "time values: 9.0\n",
            ),
        )
        .unwrap();

        let descriptor = parse(&case_path, &Logger::silent()).unwrap();
        assert_eq!(descriptor.time_sets.len(), 2);
        assert_eq!(descriptor.time_sets[0].time_values, vec![1.0, 2.0]);
        assert_eq!(descriptor.time_sets[1].time_values, vec![9.0]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
