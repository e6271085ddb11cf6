use trile_geom::{Aabb, Axis, Emplacement, Face, Vec3};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn vec3_approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
}

#[test]
fn vec3_constants() {
    assert!(vec3_approx_eq(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.0), 1e-6));
    assert!(vec3_approx_eq(Vec3::UP, Vec3::new(0.0, 1.0, 0.0), 1e-6));
    assert!(vec3_approx_eq(Vec3::ONE, Vec3::splat(1.0), 1e-6));
}

#[test]
fn vec3_add_sub_neg() {
    let a = Vec3::new(1.0, 2.0, 3.0);
    let b = Vec3::new(-4.0, 5.0, -6.0);
    let c = a + b;
    assert!(vec3_approx_eq(c, Vec3::new(-3.0, 7.0, -3.0), 1e-6));
    assert!(vec3_approx_eq(c - a, b, 1e-6));
    assert!(vec3_approx_eq(-a + a, Vec3::ZERO, 1e-6));
}

#[test]
fn vec3_dot_length_normalized() {
    let v = Vec3::new(3.0, 4.0, 0.0);
    assert!(approx_eq(v.dot(v), 25.0, 1e-6));
    assert!(approx_eq(v.length(), 5.0, 1e-6));
    let n = v.normalized();
    assert!(vec3_approx_eq(n, Vec3::new(0.6, 0.8, 0.0), 1e-6));

    // Zero vector normalization should be a no-op
    assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
}

#[test]
fn vec3_axis_matches_fields() {
    let v = Vec3::new(1.5, -2.0, 9.0);
    assert_eq!(v.axis(Axis::X), 1.5);
    assert_eq!(v.axis(Axis::Y), -2.0);
    assert_eq!(v.axis(Axis::Z), 9.0);
    assert_eq!(v.floor(), Vec3::new(1.0, -2.0, 9.0));
}

#[test]
fn face_normals_point_at_neighbor_cells() {
    let e = Emplacement::new(4, 4, 4);
    for face in Face::ALL {
        let n = e.step(face);
        let d = n.center() - e.center();
        assert!(vec3_approx_eq(d, face.normal(), 1e-6));
    }
}

#[test]
fn emplacement_within_is_half_open() {
    let size = Emplacement::new(3, 2, 1);
    assert!(Emplacement::new(0, 0, 0).within(size));
    assert!(Emplacement::new(2, 1, 0).within(size));
    assert!(!Emplacement::new(3, 0, 0).within(size));
    assert!(!Emplacement::new(0, -1, 0).within(size));
    assert!(!Emplacement::new(0, 0, 1).within(size));
}

#[test]
fn unit_cell_bounds_contain_center_only_in_own_cell() {
    let e = Emplacement::new(2, 0, 5);
    let b = Aabb::from_center_size(e.center(), Vec3::ONE);
    assert!(b.contains(e.center()));
    assert!(!b.contains(e.step(Face::PosX).center()));
    assert!(vec3_approx_eq(b.center(), e.center(), 1e-6));
}
