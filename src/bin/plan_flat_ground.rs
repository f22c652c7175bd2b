// Flat-ground footstep planning demo
//
// Plans from the origin to a goal 3 m ahead over a single flat terrain
// region and renders the footstep sequence with gnuplot.

use gnuplot::{AxesCommon, Caption, Color, Figure};

use footstep_planner::planner::{FootstepPlannerRequest, FootstepPlanningModule};
use footstep_planner::{PlanarRegion, PlanarRegionsList, Pose3D, RobotSide, SideDependent};

const SHOW_ANIMATION: bool = true;

fn main() {
    env_logger::init();

    println!("Footstep planning start!!");

    let terrain = PlanarRegionsList::new(vec![PlanarRegion::flat_square(1, 2.0, 0.0, 0.0, 4.0)]);

    let request = FootstepPlannerRequest {
        request_id: 1,
        goal_foot_poses: SideDependent::new(
            Pose3D::from_xyz_yaw(3.0, 0.1, 0.0, 0.0),
            Pose3D::from_xyz_yaw(3.0, -0.1, 0.0, 0.0),
        ),
        planar_regions: Some(terrain),
        plan_body_path: false,
        timeout_seconds: 10.0,
        ..FootstepPlannerRequest::default()
    };

    let mut module = FootstepPlanningModule::new("flat_ground_demo");
    module.add_status_callback(Box::new(|output| {
        println!(
            "planner status: {:?} with {} steps",
            output.result,
            output.footstep_plan.num_steps()
        );
    }));

    let output = match module.handle_request(&request) {
        Some(output) => output,
        None => {
            println!("planner was busy, no plan produced");
            return;
        }
    };

    println!(
        "Result: {:?} ({} steps, {:.1} ms total)",
        output.result,
        output.footstep_plan.num_steps(),
        1000.0 * output.timings.total_elapsed_seconds
    );

    for (i, step) in output.footstep_plan.steps().iter().enumerate() {
        println!(
            "  step {:2}: {:?} at ({:.2}, {:.2}, {:.2})",
            i,
            step.side,
            step.sole_pose.position.x,
            step.sole_pose.position.y,
            step.sole_pose.position.z
        );
    }

    if SHOW_ANIMATION && !output.footstep_plan.is_empty() {
        let left_x: Vec<f64> = output
            .footstep_plan
            .steps()
            .iter()
            .filter(|s| s.side == RobotSide::Left)
            .map(|s| s.sole_pose.position.x)
            .collect();
        let left_y: Vec<f64> = output
            .footstep_plan
            .steps()
            .iter()
            .filter(|s| s.side == RobotSide::Left)
            .map(|s| s.sole_pose.position.y)
            .collect();
        let right_x: Vec<f64> = output
            .footstep_plan
            .steps()
            .iter()
            .filter(|s| s.side == RobotSide::Right)
            .map(|s| s.sole_pose.position.x)
            .collect();
        let right_y: Vec<f64> = output
            .footstep_plan
            .steps()
            .iter()
            .filter(|s| s.side == RobotSide::Right)
            .map(|s| s.sole_pose.position.y)
            .collect();

        let mut fg = Figure::new();
        fg.axes2d()
            .points(&left_x, &left_y, &[Caption("Left steps"), Color("red")])
            .points(&right_x, &right_y, &[Caption("Right steps"), Color("blue")])
            .points(&[0.0], &[0.0], &[Caption("Start"), Color("green")])
            .points(&[3.0], &[0.0], &[Caption("Goal"), Color("black")])
            .set_aspect_ratio(gnuplot::AutoOption::Fix(1.0))
            .set_title("Flat Ground Footstep Plan", &[])
            .set_x_label("X [m]", &[])
            .set_y_label("Y [m]", &[]);

        let output_path = "img/footstep_planning/flat_ground_plan.png";
        std::fs::create_dir_all("img/footstep_planning").unwrap();
        fg.save_to_png(output_path, 800, 600).unwrap();
        println!("Plot saved to: {}", output_path);
    }

    println!("Footstep planning finish!!");
}
