use crate::core::log_context::LogContext;
use crate::core::render_states::PrimitiveType;
use crate::scene::model::{Mesh, ModelNode, Vertex};
use nalgebra::{Point3, Vector3};
use std::path::Path;

/// Area-weighted average of the adjacent face normals.
fn generate_smooth_vertex_normals(
    positions: &[Point3<f32>],
    indices: &[u32],
    log: LogContext,
) -> Result<Vec<Vector3<f32>>, String> {
    if indices.len() % 3 != 0 {
        return Err("triangle index count must be a multiple of 3".to_string());
    }
    let mut normals = vec![Vector3::zeros(); positions.len()];

    for (face, tri) in indices.chunks_exact(3).enumerate() {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            log.warn(format_args!("face {} references a vertex out of range, skipped", face));
            continue;
        }
        let face_normal = (positions[i1] - positions[i0]).cross(&(positions[i2] - positions[i0]));
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    let mut zero_count = 0;
    for normal in normals.iter_mut() {
        if normal.norm_squared() > 1e-12 {
            normal.normalize_mut();
        } else {
            *normal = Vector3::y();
            zero_count += 1;
        }
    }
    if zero_count > 0 {
        log.warn(format_args!("{} vertices without a usable normal, using +Y", zero_count));
    }

    Ok(normals)
}

fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// Loads an OBJ file into a model tree with one child per OBJ object.
///
/// Faces are triangulated and indices unified. Vertex colors come from the
/// material's diffuse color when there is one, otherwise `base_color`.
pub fn load_obj_model<P: AsRef<Path>>(
    obj_path: P,
    base_color: Vector3<f32>,
    log: LogContext,
) -> Result<ModelNode, String> {
    let obj_path = obj_path.as_ref();
    log.info(format_args!("loading OBJ {:?}", obj_path));

    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ignore_points: true,
        ignore_lines: true,
    };
    let (models, materials_result) = tobj::load_obj(obj_path, &load_options)
        .map_err(|e| format!("failed to load OBJ {}: {}", obj_path.display(), e))?;

    let materials = match materials_result {
        Ok(materials) => {
            log.debug(format_args!("{} materials from MTL", materials.len()));
            materials
        }
        Err(e) => {
            log.warn(format_args!("MTL not loaded ({}), using base color", e));
            Vec::new()
        }
    };

    let mut root = ModelNode::new(&basename(obj_path));
    for model in models {
        let mesh = model.mesh;
        if mesh.indices.is_empty() || mesh.positions.is_empty() {
            log.warn(format_args!("OBJ object '{}' has no faces, skipped", model.name));
            continue;
        }

        let positions: Vec<Point3<f32>> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();

        let normals = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals
                .chunks_exact(3)
                .map(|n| Vector3::new(n[0], n[1], n[2]).normalize())
                .collect()
        } else {
            log.debug(format_args!(
                "object '{}' has no normals, generating smooth normals",
                model.name
            ));
            generate_smooth_vertex_normals(&positions, &mesh.indices, log)?
        };

        let color = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .and_then(|m| m.diffuse)
            .map(Vector3::from)
            .unwrap_or(base_color);

        let vertices = positions
            .iter()
            .zip(&normals)
            .map(|(p, n)| Vertex::new(*p, *n, color))
            .collect();
        let out = Mesh::new(&model.name, vertices, mesh.indices, PrimitiveType::Triangle);
        log.debug(format_args!(
            "object '{}': {} vertices, {} triangles",
            model.name,
            out.vertices.len(),
            out.primitive_count()
        ));
        root.add_child(ModelNode::with_mesh(&model.name, out));
    }

    if root.mesh_count() == 0 {
        return Err(format!("OBJ {} contains no triangles", obj_path.display()));
    }
    log.info(format_args!("loaded {} meshes from {:?}", root.mesh_count(), obj_path));
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_normals_average_adjacent_faces() {
        let positions = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 5.0),
        ];
        let normals = generate_smooth_vertex_normals(&positions, &[0, 1, 2], LogContext::silent()).unwrap();
        assert_eq!(normals[0], Vector3::z());
        // unused vertex
        assert_eq!(normals[3], Vector3::y());
        assert!(generate_smooth_vertex_normals(&positions, &[0, 1], LogContext::silent()).is_err());
    }

    #[test]
    fn loads_a_triangulated_quad() {
        let dir = std::env::temp_dir().join(format!("softrender-obj-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("quad.obj");
        std::fs::write(
            &path,
            "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();

        let model = load_obj_model(&path, Vector3::new(0.5, 0.5, 0.5), LogContext::silent()).unwrap();
        assert_eq!(model.name, "quad");
        assert_eq!(model.mesh_count(), 1);
        let mesh = &model.children[0].meshes[0];
        assert_eq!(mesh.primitive_count(), 2);
        assert!(mesh.vertices.iter().all(|v| v.color == Vector3::new(0.5, 0.5, 0.5)));
        assert!(mesh.vertices.iter().all(|v| (v.normal - Vector3::z()).norm() < 1e-6));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_obj_model("does/not/exist.obj", Vector3::zeros(), LogContext::silent()).is_err());
    }
}
