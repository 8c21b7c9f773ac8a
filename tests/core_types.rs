use glam::Vec3;
use stardist3d::{
    FaceMesh, LabelRenderer, NmsConfig, Polyhedra, RayTemplate, StarDistError, Suppressor,
};

#[test]
fn ray_template_rejects_degenerate_directions() {
    let err = RayTemplate::new(vec![Vec3::X, Vec3::ZERO]).err().unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));

    let err = RayTemplate::new(vec![Vec3::new(f32::NAN, 0.0, 1.0)])
        .err()
        .unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));

    let err = RayTemplate::from_flat(&[1.0, 0.0]).err().unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));
}

#[test]
fn ray_directions_are_kept_as_given() {
    let rays = RayTemplate::from_flat(&[2.0, 0.0, 0.0, 0.0, 0.5, 0.0]).unwrap();
    assert_eq!(rays.direction(0), Vec3::new(2.0, 0.0, 0.0));
    assert_eq!(rays.direction(1), Vec3::new(0.0, 0.5, 0.0));

    let verts = stardist3d::geometry::vertices(&[3.0, 3.0], Vec3::ONE, &rays);
    assert_eq!(verts, vec![Vec3::new(7.0, 1.0, 1.0), Vec3::new(1.0, 2.5, 1.0)]);
}

#[test]
fn face_mesh_rejects_out_of_range_indices() {
    let err = FaceMesh::from_flat(&[0, 1, 2, 0, 2, 5], 4).err().unwrap();
    assert_eq!(
        err,
        StarDistError::FaceIndexOutOfRange {
            face: 1,
            index: 5,
            n_rays: 4,
        }
    );

    let err = FaceMesh::from_flat(&[0, -1, 2], 4).err().unwrap();
    assert_eq!(
        err,
        StarDistError::FaceIndexOutOfRange {
            face: 0,
            index: -1,
            n_rays: 4,
        }
    );
}

#[test]
fn polyhedra_reject_malformed_buffers() {
    let err = Polyhedra::new(&[1.0; 4], &[0.0; 4], 2).err().unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));

    let err = Polyhedra::new(&[1.0, f32::INFINITY], &[0.0; 3], 2)
        .err()
        .unwrap();
    assert_eq!(err, StarDistError::InvalidDistance { poly: 0, ray: 1 });

    let err = Polyhedra::new(&[], &[0.0; 3], 0).err().unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));
}

#[test]
fn suppressor_rejects_template_mismatch() {
    let (rays, faces) = RayTemplate::icosphere(0);
    let dist = vec![1.0f32; 2 * 5];
    let centers = [0.0f32; 6];
    let polys = Polyhedra::new(&dist, &centers, 5).unwrap();

    let err = Suppressor::new(&rays, &faces)
        .run(polys, &[1.0, 0.5])
        .err()
        .unwrap();
    assert_eq!(
        err,
        StarDistError::ShapeMismatch {
            what: "rays",
            expected: 5,
            got: rays.len(),
        }
    );
}

#[test]
fn suppressor_rejects_invalid_threshold() {
    let (rays, faces) = RayTemplate::icosphere(0);
    let polys = Polyhedra::new(&[], &[], rays.len()).unwrap();
    let err = Suppressor::new(&rays, &faces)
        .with_config(NmsConfig {
            threshold: 2.0,
            ..NmsConfig::default()
        })
        .run(polys, &[])
        .err()
        .unwrap();
    assert!(matches!(err, StarDistError::InvalidInput(_)));
}

#[test]
fn renderer_rejects_label_count_mismatch() {
    let (rays, faces) = RayTemplate::icosphere(0);
    let dist = vec![1.0f32; rays.len()];
    let polys = Polyhedra::new(&dist, &[2.0, 2.0, 2.0], rays.len()).unwrap();
    let err = LabelRenderer::new(&rays, &faces)
        .render(polys, &[1, 2], [4, 4, 4])
        .err()
        .unwrap();
    assert_eq!(
        err,
        StarDistError::ShapeMismatch {
            what: "labels",
            expected: 1,
            got: 2,
        }
    );
}

#[test]
fn mesh_from_another_template_is_rejected() {
    let (rays, _) = RayTemplate::icosphere(0);
    let (_, big_faces) = RayTemplate::icosphere(1);
    let err = big_faces.check_rays(&rays).err().unwrap();
    assert!(matches!(err, StarDistError::FaceIndexOutOfRange { .. }));
}
