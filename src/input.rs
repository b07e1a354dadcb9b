use json::JsonValue;
use nalgebra::{Matrix2x3, Matrix3, Vector3};

use crate::{
    datatypes::{CourseMesh, Element, OptimizerSettings, ReferenceTriangle, Vertex},
    error::FlattenError,
    material::{compute_orthotropic_stiffness, compute_stress_strain_matrix},
    projection::project_triangles,
};

/// Everything needed to run one layout optimization
#[derive(Debug, Clone)]
pub struct FlatteningInput {
    pub mesh: CourseMesh,
    pub stiffness: Matrix3<f64>,
    pub initial_layout: Vec<Vertex>,
    pub settings: OptimizerSettings,
}

fn parse_f64(value: &JsonValue, what: &str) -> Result<f64, FlattenError> {
    match value.as_f64() {
        Some(v) => Ok(v),
        None => Err(FlattenError::Input(format!(
            "Expected a number for {what}, found {value}"
        ))),
    }
}

/// Parses a fixed-length numeric array
fn parse_array<const N: usize>(value: &JsonValue, what: &str) -> Result<[f64; N], FlattenError> {
    if !value.is_array() || value.len() != N {
        return Err(FlattenError::Input(format!(
            "Expected {N} numbers for {what}, found {value}"
        )));
    }

    let mut out = [0.0; N];
    for (i, member) in value.members().enumerate() {
        out[i] = parse_f64(member, what)?;
    }
    Ok(out)
}

fn parse_list<T>(
    input_json: &JsonValue,
    key: &str,
    parse_item: impl Fn(&JsonValue, &str) -> Result<T, FlattenError>,
) -> Result<Vec<T>, FlattenError> {
    let list = &input_json[key];
    if !list.is_array() {
        return Err(FlattenError::Input(format!(
            "Input json field {key} must be an array"
        )));
    }

    list.members()
        .enumerate()
        .map(|(i, item)| parse_item(item, format!("{key}[{i}]").as_str()))
        .collect()
}

fn parse_vertex(value: &JsonValue, what: &str) -> Result<Vertex, FlattenError> {
    let [x, y] = parse_array::<2>(value, what)?;
    Ok(Vertex::new(x, y))
}

fn parse_element(value: &JsonValue, what: &str) -> Result<Element, FlattenError> {
    if !value.is_array() || value.len() != 3 {
        return Err(FlattenError::Input(format!(
            "Expected 3 vertex indices for {what}, found {value}"
        )));
    }

    let mut nodes = [0usize; 3];
    for (i, member) in value.members().enumerate() {
        nodes[i] = match member.as_usize() {
            Some(n) => n,
            None => {
                return Err(FlattenError::Input(format!(
                    "Non-integer vertex index in {what}"
                )))
            }
        };
    }
    Ok(Element { nodes })
}

fn parse_reference_triangle(value: &JsonValue, what: &str) -> Result<ReferenceTriangle, FlattenError> {
    if !value.is_array() || value.len() != 3 {
        return Err(FlattenError::Input(format!(
            "Expected 3 points for {what}, found {value}"
        )));
    }
    Ok([
        parse_vertex(&value[0], what)?,
        parse_vertex(&value[1], what)?,
        parse_vertex(&value[2], what)?,
    ])
}

fn parse_surface_triangle(value: &JsonValue, what: &str) -> Result<[Vector3<f64>; 3], FlattenError> {
    if !value.is_array() || value.len() != 3 {
        return Err(FlattenError::Input(format!(
            "Expected 3 points for {what}, found {value}"
        )));
    }

    let mut points = [Vector3::zeros(); 3];
    for (i, member) in value.members().enumerate() {
        points[i] = Vector3::from(parse_array::<3>(member, what)?);
    }
    Ok(points)
}

fn parse_basis(value: &JsonValue, what: &str) -> Result<Matrix2x3<f64>, FlattenError> {
    if !value.is_array() || value.len() != 2 {
        return Err(FlattenError::Input(format!(
            "Expected 2 in-plane axes for {what}, found {value}"
        )));
    }

    let first = parse_array::<3>(&value[0], what)?;
    let second = parse_array::<3>(&value[1], what)?;
    Ok(Matrix2x3::new(
        first[0], first[1], first[2], second[0], second[1], second[2],
    ))
}

/// Parses the material block into a stiffness matrix. Accepts an explicit
/// matrix, isotropic constants or orthotropic ply constants.
fn parse_material(material: &JsonValue) -> Result<Matrix3<f64>, FlattenError> {
    if material.has_key("stiffness") {
        let rows = &material["stiffness"];
        if !rows.is_array() || rows.len() != 3 {
            return Err(FlattenError::Input(
                "Material stiffness must be a 3x3 array".to_owned(),
            ));
        }
        let r0 = parse_array::<3>(&rows[0], "stiffness row 0")?;
        let r1 = parse_array::<3>(&rows[1], "stiffness row 1")?;
        let r2 = parse_array::<3>(&rows[2], "stiffness row 2")?;
        return Ok(Matrix3::new(
            r0[0], r0[1], r0[2], r1[0], r1[1], r1[2], r2[0], r2[1], r2[2],
        ));
    }

    if material.has_key("e1") {
        for key in ["e2", "nu12", "g12"] {
            if !material.has_key(key) {
                return Err(FlattenError::Input(format!(
                    "Input json missing {key} field in material section"
                )));
            }
        }
        return compute_orthotropic_stiffness(
            parse_f64(&material["e1"], "e1")?,
            parse_f64(&material["e2"], "e2")?,
            parse_f64(&material["nu12"], "nu12")?,
            parse_f64(&material["g12"], "g12")?,
        );
    }

    if material.has_key("youngs_modulus") {
        if !material.has_key("poisson_ratio") {
            return Err(FlattenError::Input(
                "Input json missing poisson_ratio field in material section".to_owned(),
            ));
        }
        return Ok(compute_stress_strain_matrix(
            parse_f64(&material["poisson_ratio"], "poisson_ratio")?,
            parse_f64(&material["youngs_modulus"], "youngs_modulus")?,
        ));
    }

    Err(FlattenError::Input(
        "Material section needs stiffness, youngs_modulus or e1".to_owned(),
    ))
}

fn parse_settings(input_json: &JsonValue) -> Result<OptimizerSettings, FlattenError> {
    let mut settings = OptimizerSettings::default();
    if !input_json.has_key("optimizer") {
        return Ok(settings);
    }

    let optimizer = &input_json["optimizer"];
    if optimizer.has_key("step_size") {
        settings.step_size = parse_f64(&optimizer["step_size"], "step_size")?;
    }
    if optimizer.has_key("iterations") {
        settings.iterations = match optimizer["iterations"].as_u64() {
            Some(n) => n,
            None => {
                return Err(FlattenError::Input(
                    "Optimizer iterations must be a non-negative integer".to_owned(),
                ))
            }
        };
    }

    Ok(settings)
}

fn parse_reference(input_json: &JsonValue) -> Result<Vec<ReferenceTriangle>, FlattenError> {
    if input_json.has_key("reference_triangles") {
        return parse_list(input_json, "reference_triangles", parse_reference_triangle);
    }

    if !input_json.has_key("inplane_bases") {
        return Err(FlattenError::Input(
            "Input json has surface_triangles but no inplane_bases".to_owned(),
        ));
    }
    let triangles = parse_list(input_json, "surface_triangles", parse_surface_triangle)?;
    let bases = parse_list(input_json, "inplane_bases", parse_basis)?;
    project_triangles(&triangles, &bases)
}

/// Builds a flattening problem from the text of an input json
///
/// # Arguments
/// * `contents` - The input file contents
///
/// # Returns
/// A FlatteningInput with a validated mesh
pub fn parse_input(contents: &str) -> Result<FlatteningInput, FlattenError> {
    let input_json = match json::parse(contents) {
        Ok(f) => f,
        Err(err) => {
            return Err(FlattenError::Input(format!(
                "Error in input file json: {err}"
            )))
        }
    };

    for key in ["material", "layout", "elements"] {
        if !input_json.has_key(key) {
            return Err(FlattenError::Input(format!(
                "Input json missing {key} field"
            )));
        }
    }
    if !input_json.has_key("reference_triangles") && !input_json.has_key("surface_triangles") {
        return Err(FlattenError::Input(
            "Input json needs reference_triangles or surface_triangles".to_owned(),
        ));
    }

    let stiffness = parse_material(&input_json["material"])?;
    let settings = parse_settings(&input_json)?;
    let reference = parse_reference(&input_json)?;
    let initial_layout = parse_list(&input_json, "layout", parse_vertex)?;
    let elements = parse_list(&input_json, "elements", parse_element)?;

    let mesh = CourseMesh::new(reference, elements, initial_layout.len())?;

    Ok(FlatteningInput {
        mesh,
        stiffness,
        initial_layout,
        settings,
    })
}

/// Reads and parses an input json file
pub fn load_input_file(input_file: &str) -> Result<FlatteningInput, FlattenError> {
    let file_string = match std::fs::read_to_string(input_file) {
        Ok(f) => f,
        Err(_err) => {
            return Err(FlattenError::Input(format!(
                "Unable to open input file {}",
                input_file
            )))
        }
    };

    parse_input(&file_string)
}
