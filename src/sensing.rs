//! Sensing & motion: every agent samples the published field through a fan
//! of sensors, steers toward stronger trail and integrates point-mass
//! dynamics. Agents are independent within a tick, so the stage runs as a
//! plain parallel loop over the agent slice.

use crate::agents::Agent;
use crate::counters::CellCounters;
use crate::field::{cell_of, toroidal_delta, wrap_position, Grid};
use physarum_common::{SimParams, Vec2};
use rayon::prelude::*;

/// Angular offsets (radians) of the sensor fan, spanning `[-angle, +angle]` symmetrically.
///
/// A single sensor always points straight ahead.
pub fn sensor_offsets(sensor_count: usize, sensor_angle_deg: f32) -> Vec<f32> {
    if sensor_count <= 1 {
        return vec![0.0];
    }
    let half_spread = sensor_angle_deg.to_radians();
    let last = (sensor_count - 1) as f32;
    (0..sensor_count)
        .map(|k| half_spread * (2.0 * k as f32 / last - 1.0))
        .collect()
}

/// Steering direction for one agent: the reading-weighted average of the sensor directions.
///
/// Returns zero when no sensor reads any trail. `on_tip` sees every sensor tip position.
pub fn steering_direction<F>(
    agent: &Agent,
    field: &Grid,
    offsets: &[f32],
    sensor_range: f32,
    mut on_tip: F,
) -> Vec2
where
    F: FnMut(Vec2),
{
    let mut weighted = Vec2::ZERO;
    let mut total = 0.0f32;
    for &offset in offsets {
        let direction = agent.heading.rotate(offset);
        let tip = agent.position + direction * sensor_range;
        on_tip(tip);
        let reading = field.sample(tip);
        if reading > 0.0 {
            weighted += direction * reading;
            total += reading;
        }
    }
    if total > 0.0 {
        weighted * (1.0 / total)
    } else {
        Vec2::ZERO
    }
}

/// Replaces the steering with a push away from the brush center when the agent is under the brush.
#[inline(always)]
pub fn brush_bias(
    agent: &Agent,
    steer: Vec2,
    center: Option<Vec2>,
    brush_size: f32,
    rez: usize,
) -> Vec2 {
    let Some(center) = center else { return steer };
    if brush_size <= 0.0 {
        return steer;
    }
    let away = toroidal_delta(center, agent.position, rez);
    if away.length() <= brush_size {
        away.normalize_or(agent.heading)
    } else {
        steer
    }
}

/// Point-mass update for one agent. Keeps the previous heading if the velocity collapses.
#[inline(always)]
pub fn integrate(agent: &mut Agent, steer: Vec2, params: &SimParams) {
    let force = steer * params.sensor_force;
    let acceleration = force / params.mass;
    agent.velocity = agent.velocity * (1.0 - params.drag) + acceleration;
    agent.position = wrap_position(agent.position + agent.velocity * params.speed, params.rez);
    agent.heading = agent.velocity.normalize_or(agent.heading);
}

/// Runs sensing and motion for every agent against the published `field`.
///
/// When `debug` is given, every sensor tip registers a hit in its cell.
pub fn sense_and_move(
    agents: &mut [Agent],
    field: &Grid,
    params: &SimParams,
    interaction: Option<Vec2>,
    debug: Option<&CellCounters>,
) {
    let offsets = sensor_offsets(params.sensor_count, params.sensor_angle_deg);
    let rez = field.rez();

    agents.par_iter_mut().for_each(|agent| {
        let steer = steering_direction(agent, field, &offsets, params.sensor_range, |tip| {
            if let Some(counters) = debug {
                let (x, y) = cell_of(tip, rez);
                counters.hit(field.index(x, y));
            }
        });
        let steer = brush_bias(agent, steer, interaction, params.brush_size, rez);
        integrate(agent, steer, params);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rez: usize) -> SimParams {
        SimParams {
            rez,
            agent_count: 1,
            drag: 0.0,
            speed: 1.0,
            sensor_force: 1.0,
            mass: 1.0,
            ..SimParams::default()
        }
    }

    #[test]
    fn fan_is_symmetric_and_single_sensor_faces_forward() {
        assert_eq!(sensor_offsets(1, 45.0), vec![0.0]);
        let fan = sensor_offsets(3, 45.0);
        assert_eq!(fan.len(), 3);
        assert!((fan[0] + 45f32.to_radians()).abs() < 1e-6);
        assert_eq!(fan[1], 0.0);
        assert!((fan[2] - 45f32.to_radians()).abs() < 1e-6);
        let fan = sensor_offsets(4, 90.0);
        assert!((fan[0] + fan[3]).abs() < 1e-6);
        assert!((fan[1] + fan[2]).abs() < 1e-6);
    }

    #[test]
    fn steers_toward_the_only_trail() {
        let mut field = Grid::try_new(16, "test").unwrap();
        let agent = Agent::new(Vec2::new(8.5, 8.5), Vec2::X);
        // Trail at the left-turning sensor (+90 degrees, i.e. +y)
        field.set(8, 11, 2.0);
        let offsets = sensor_offsets(3, 90.0);
        let steer = steering_direction(&agent, &field, &offsets, 3.0, |_| {});
        assert!(steer.x.abs() < 1e-5);
        assert!((steer.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn weighted_blend_between_sensors() {
        let mut field = Grid::try_new(16, "test").unwrap();
        let agent = Agent::new(Vec2::new(8.5, 8.5), Vec2::X);
        field.set(11, 8, 1.0); // forward
        field.set(8, 11, 1.0); // left
        let offsets = sensor_offsets(3, 90.0);
        let steer = steering_direction(&agent, &field, &offsets, 3.0, |_| {});
        assert!((steer.x - 0.5).abs() < 1e-5);
        assert!((steer.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn zero_range_senses_own_cell() {
        let mut field = Grid::try_new(8, "test").unwrap();
        field.set(3, 3, 1.0);
        let agent = Agent::new(Vec2::new(3.2, 3.7), Vec2::X);
        let mut tips = Vec::new();
        let offsets = sensor_offsets(5, 60.0);
        let steer = steering_direction(&agent, &field, &offsets, 0.0, |tip| tips.push(tip));
        assert_eq!(tips.len(), 5);
        assert!(tips.iter().all(|&t| t == agent.position));
        // All sensors read the same cell, so the blend averages the fan back to the heading.
        assert!(steer.y.abs() < 1e-5);
        assert!(steer.x > 0.0);
    }

    #[test]
    fn no_trail_means_straight_motion() {
        let field = Grid::try_new(8, "test").unwrap();
        let mut agents = vec![Agent::new(Vec2::new(4.0, 4.0), Vec2::X)];
        let p = SimParams { speed: 0.5, ..params(8) };
        sense_and_move(&mut agents, &field, &p, None, None);
        assert_eq!(agents[0].position, Vec2::new(4.5, 4.0));
        assert_eq!(agents[0].heading, Vec2::X);
    }

    #[test]
    fn motion_wraps_around_the_edge() {
        let field = Grid::try_new(8, "test").unwrap();
        let mut agents = vec![Agent::new(Vec2::new(7.5, 0.25), -Vec2::new(0.0, 1.0))];
        sense_and_move(&mut agents, &field, &params(8), None, None);
        assert_eq!(agents[0].position, Vec2::new(7.5, 7.25));
    }

    #[test]
    fn collapsed_velocity_keeps_previous_heading() {
        let mut agent = Agent::new(Vec2::new(2.0, 2.0), Vec2::new(0.0, 1.0));
        let p = SimParams { drag: 1.0, sensor_force: 0.0, ..params(8) };
        integrate(&mut agent, Vec2::ZERO, &p);
        assert_eq!(agent.velocity, Vec2::ZERO);
        assert_eq!(agent.heading, Vec2::new(0.0, 1.0));
        assert_eq!(agent.position, Vec2::new(2.0, 2.0));
        assert!(agent.position.is_finite());
    }

    #[test]
    fn brush_pushes_agents_away_from_center() {
        let agent = Agent::new(Vec2::new(5.0, 4.0), Vec2::new(0.0, 1.0));
        let steer = brush_bias(&agent, Vec2::ZERO, Some(Vec2::new(4.0, 4.0)), 2.0, 16);
        assert_eq!(steer, Vec2::X);

        // Outside the brush the steering is untouched
        let steer = brush_bias(&agent, Vec2::new(0.0, 1.0), Some(Vec2::new(10.0, 10.0)), 2.0, 16);
        assert_eq!(steer, Vec2::new(0.0, 1.0));

        // Across the wrap seam the push still points away from the center
        let edge = Agent::new(Vec2::new(0.5, 4.0), Vec2::X);
        let steer = brush_bias(&edge, Vec2::ZERO, Some(Vec2::new(15.5, 4.0)), 2.0, 16);
        assert_eq!(steer, Vec2::X);
    }

    #[test]
    fn debug_counters_record_sensor_tips() {
        let field = Grid::try_new(8, "test").unwrap();
        let counters = CellCounters::try_new(64).unwrap();
        let mut agents = vec![Agent::new(Vec2::new(1.5, 1.5), Vec2::X); 2];
        let p = SimParams { sensor_count: 1, sensor_range: 2.0, ..params(8) };
        sense_and_move(&mut agents, &field, &p, None, Some(&counters));
        assert_eq!(counters.get(field.index(3, 1)), 2);
    }
}
