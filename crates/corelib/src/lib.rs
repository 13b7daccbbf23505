//! Core types: math re-exports, Camera, model Orientation, frame statistics.

pub use glam::{Mat4, Vec3, Vec4, vec3};

pub mod camera;
pub mod fps;
pub mod orientation;

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI, TAU};
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn default_orientation_is_identity_matrix() {
        let o = orientation::Orientation::default();
        assert_eq!(o.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn phi_wraps_and_theta_clamps() {
        let mut o = orientation::Orientation::new(-FRAC_PI_2, 0.0);
        assert!((o.phi() - 3.0 * FRAC_PI_2).abs() < 1e-5);

        o.advance(1.0, TAU, 10.0);
        assert!((o.phi() - 3.0 * FRAC_PI_2).abs() < 1e-4);
        assert_eq!(o.theta(), FRAC_PI_2);

        o.advance(1.0, 0.0, -10.0);
        assert_eq!(o.theta(), -FRAC_PI_2);
    }

    #[test]
    fn orientation_rotates_y_before_x() {
        let o = orientation::Orientation::new(FRAC_PI_2, PI / 4.0);
        // RotY(90°) takes +X to -Z; RotX(45°) then tips it up towards +Y.
        let p = o.matrix().transform_point3(vec3(1.0, 0.0, 0.0));
        let s = (0.5f32).sqrt();
        assert!((p - vec3(0.0, s, -s)).length() < 1e-5, "{p:?}");
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::looking_at_origin(4.0, 16.0 / 9.0);
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn camera_maps_origin_inside_depth_range() {
        let cam = camera::Camera::looking_at_origin(4.0, 1.0);
        let clip = cam.proj_view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc_z = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&ndc_z));
        assert!(clip.x.abs() < 1e-6 && clip.y.abs() < 1e-6);
    }

    #[test]
    fn fps_reports_once_per_second() {
        let t0 = Instant::now();
        let mut counter = fps::FpsCounter::starting_at(t0);
        for i in 0..60 {
            assert!(counter.tick(t0 + Duration::from_millis(i * 16)).is_none());
        }
        let stats = counter.tick(t0 + Duration::from_secs(1)).expect("report");
        assert!((stats.fps - 60.0).abs() < 1e-9);
        assert!((stats.frame_time_ms - 1000.0 / 60.0).abs() < 1e-9);
        assert_eq!(counter.last(), Some(stats));
        assert!(counter.tick(t0 + Duration::from_millis(1500)).is_none());
    }

    #[test]
    fn fps_title_format() {
        let t0 = Instant::now();
        let mut counter = fps::FpsCounter::starting_at(t0);
        for _ in 0..50 {
            counter.tick(t0);
        }
        let stats = counter.tick(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(stats.title("Trisoup"), "Trisoup: 40.00 ms/frame (25.0 FPS)");
    }
}
