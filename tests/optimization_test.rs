use chessboard_calibration::board::{BoardConfig, ObjectTemplate};
use chessboard_calibration::camera_model::PinholeCamera;
use chessboard_calibration::optimization::{
    factors::{ParamLayout, ReleasedObjectFactor, ReprojectionFactor},
    homography::{find_homography, focal_from_homographies, pose_from_homography},
    linear::init_pose,
};
use chessboard_calibration::synthetic::{project_template, random_poses};
use chessboard_calibration::types::RvecTvec;
use glam::Vec3;
use nalgebra as na;
use std::sync::Arc;
use tiny_solver::factors::Factor;

fn board_xy(template: &ObjectTemplate) -> Vec<na::Vector2<f64>> {
    template
        .points
        .iter()
        .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
        .collect()
}

#[test]
fn test_find_homography_recovers_matrix() {
    let h = na::Matrix3::new(1.2, 0.1, 30.0, -0.05, 1.1, 20.0, 1e-4, 2e-4, 1.0);
    let src: Vec<na::Vector2<f64>> = (0..12)
        .map(|i| na::Vector2::new((i % 4) as f64 * 40.0, (i / 4) as f64 * 40.0))
        .collect();
    let dst: Vec<na::Vector2<f64>> = src
        .iter()
        .map(|p| {
            let q = h * na::Vector3::new(p.x, p.y, 1.0);
            na::Vector2::new(q.x / q.z, q.y / q.z)
        })
        .collect();
    let solved = find_homography(&src, &dst).expect("homography");
    assert!((solved - h).norm() < 1e-6, "got {}", solved);

    // exactly four points is enough
    let corners = [0, 3, 8, 11];
    let src4: Vec<_> = corners.iter().map(|&i| src[i]).collect();
    let dst4: Vec<_> = corners.iter().map(|&i| dst[i]).collect();
    let solved4 = find_homography(&src4, &dst4).expect("four point homography");
    assert!((solved4 - h).norm() < 1e-6);
    assert!(find_homography(&src[..3], &dst[..3]).is_none());
}

#[test]
fn test_focal_from_homographies() {
    let board = BoardConfig::default();
    let template = ObjectTemplate::new(&board);
    let camera = PinholeCamera::new(640.0, 640.0, 319.5, 239.5);
    let homographies: Vec<_> = random_poses(&board, 6, 900.0, 11)
        .iter()
        .map(|pose| {
            let img: Vec<na::Vector2<f64>> = project_template(&camera, &template, pose)
                .iter()
                .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
                .collect();
            find_homography(&board_xy(&template), &img).unwrap()
        })
        .collect();

    let (fx, fy) = focal_from_homographies(&homographies, 319.5, 239.5, None).unwrap();
    assert!((fx - 640.0).abs() < 2.0, "fx {}", fx);
    assert!((fy - 640.0).abs() < 2.0, "fy {}", fy);

    let (fx, fy) = focal_from_homographies(&homographies, 319.5, 239.5, Some(1.0)).unwrap();
    assert!((fx - fy).abs() < 1e-9);
    assert!((fy - 640.0).abs() < 2.0, "fy {}", fy);
}

#[test]
fn test_fronto_parallel_views_fail_initialisation() {
    // pure translation: h31 = h32 = 0, no focal information
    let h = na::Matrix3::new(600.0, 0.0, 100.0, 0.0, 600.0, 80.0, 0.0, 0.0, 1.0);
    assert!(focal_from_homographies(&[h, h], 319.5, 239.5, Some(1.0)).is_err());
}

#[test]
fn test_pose_from_homography_and_init_pose() {
    let board = BoardConfig::default();
    let template = ObjectTemplate::new(&board);
    let camera = PinholeCamera::new(600.0, 600.0, 319.5, 239.5);
    let pose = random_poses(&board, 1, 900.0, 5)[0];
    let p2ds = project_template(&camera, &template, &pose);

    let normalized: Vec<na::Vector2<f64>> = p2ds
        .iter()
        .map(|p| camera.undistort_normalized(&na::Vector2::new(p.x as f64, p.y as f64)))
        .collect();
    let h = find_homography(&board_xy(&template), &normalized).unwrap();
    let (r, t) = pose_from_homography(&h).unwrap();
    assert!((r - pose.na_rvec()).norm() < 1e-4, "rvec {} vs {}", r, pose.na_rvec());
    assert!((t - pose.na_tvec()).norm() < 1e-1, "tvec {} vs {}", t, pose.na_tvec());

    let init = init_pose(&camera, &template.points, &p2ds).expect("pose");
    assert!((init.na_rvec() - pose.na_rvec()).norm() < 1e-3);
    assert!((init.na_tvec() - pose.na_tvec()).norm() < 1.0);
}

#[test]
fn test_reprojection_factor_zero_at_truth() {
    let camera = PinholeCamera::new(600.0, 610.0, 320.0, 240.0).with_distortion([-0.1, 0.02, 0.001, -0.001, 0.0, 0.0, 0.0, 0.0]);
    let pose = RvecTvec::new(&[0.1, -0.2, 0.05], &[-100.0, -50.0, 800.0]);
    let p3d = Vec3::new(120.0, 80.0, 0.0);
    let uv = camera.project_board_point(
        &pose.na_rvec(),
        &pose.na_tvec(),
        &na::Vector3::new(120.0, 80.0, 0.0),
    );
    let p2d = glam::Vec2::new(uv.x as f32, uv.y as f32);

    let params = vec![camera.intrinsics(), camera.distortion(), pose.to_dvec()];
    let layout = Arc::new(ParamLayout::all_free(&camera));
    let factor = ReprojectionFactor::new(&p3d, &p2d, layout.clone());
    let residual = <ReprojectionFactor as Factor<f64>>::residual_func(&factor, &params);
    assert!(residual.norm() < 1e-3, "residual {}", residual.norm());

    // the released variant reads the point from the fourth block
    let released = ReleasedObjectFactor::new(&p2d, layout);
    let mut params = params;
    params.push(na::dvector![120.0, 80.0, 0.0]);
    let residual = <ReleasedObjectFactor as Factor<f64>>::residual_func(&released, &params);
    assert!(residual.norm() < 1e-3);

    // moving the point changes the residual
    params[3] = na::dvector![125.0, 80.0, 0.0];
    let residual = <ReleasedObjectFactor as Factor<f64>>::residual_func(&released, &params);
    assert!(residual.norm() > 1.0);
}

#[test]
fn test_layout_keeps_fixed_entries_constant() {
    let camera = PinholeCamera::new(600.0, 600.0, 320.0, 240.0).with_distortion([-0.1, 0.02, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let pose = RvecTvec::new(&[0.1, 0.0, 0.0], &[0.0, 0.0, 500.0]);
    let p3d = Vec3::new(50.0, 20.0, 0.0);
    let uv = camera.project_board_point(&pose.na_rvec(), &pose.na_tvec(), &na::Vector3::new(50.0, 20.0, 0.0));
    let p2d = glam::Vec2::new(uv.x as f32, uv.y as f32);

    // fx tied to fy, principal point and everything after k2 held constant
    let layout = ParamLayout::new(&camera, &[2, 3], &[2, 3, 4, 5, 6, 7], Some(1.0));
    assert!(layout.has_cam() && layout.has_dist());
    assert_eq!(layout.cam_values(), na::dvector![600.0]);
    assert_eq!(layout.dist_values(), na::dvector![-0.1, 0.02]);
    assert_eq!(layout.variable_keys("pose/0", None), vec!["cam", "dist", "pose/0"]);

    let layout = Arc::new(layout);
    let factor = ReprojectionFactor::new(&p3d, &p2d, layout.clone());
    let params = vec![na::dvector![600.0], na::dvector![-0.1, 0.02], pose.to_dvec()];
    let residual = <ReprojectionFactor as Factor<f64>>::residual_func(&factor, &params);
    assert!(residual.norm() < 1e-6);

    // changing fy moves fx with it
    let params = vec![na::dvector![660.0], na::dvector![-0.1, 0.02], pose.to_dvec()];
    let residual = <ReprojectionFactor as Factor<f64>>::residual_func(&factor, &params);
    assert!(residual[0].abs() > 1.0 && residual[1].abs() > 0.1);

    let refined = layout.camera(Some(&na::dvector![610.0]), Some(&na::dvector![-0.05, 0.01]));
    assert_eq!((refined.fx, refined.fy, refined.cx, refined.cy), (610.0, 610.0, 320.0, 240.0));
    assert_eq!(refined.dist, [-0.05, 0.01, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_layout_without_camera_blocks() {
    let camera = PinholeCamera::new(600.0, 600.0, 320.0, 240.0);
    let layout = ParamLayout::new(&camera, &[0, 1, 2, 3], &[0, 1, 2, 3, 4, 5, 6, 7], None);
    assert!(!layout.has_cam() && !layout.has_dist());
    assert_eq!(layout.variable_keys("pose/3", Some("obj/5")), vec!["pose/3", "obj/5"]);

    let pose = RvecTvec::new(&[0.0, 0.0, 0.0], &[0.0, 0.0, 500.0]);
    let uv = camera.project_board_point(&pose.na_rvec(), &pose.na_tvec(), &na::Vector3::new(10.0, 5.0, 0.0));
    let released = ReleasedObjectFactor::new(&glam::Vec2::new(uv.x as f32, uv.y as f32), Arc::new(layout));
    let params = vec![pose.to_dvec(), na::dvector![10.0, 5.0, 0.0]];
    let residual = <ReleasedObjectFactor as Factor<f64>>::residual_func(&released, &params);
    assert!(residual.norm() < 1e-6);
}
