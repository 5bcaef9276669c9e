//! Hydraulic-thermal network solver (spec §4.5/§4.6).
//!
//! Drives a Newton-Raphson pipe-flow solve: the trunk/service flows are
//! fixed by design (from [`crate::sizing`]), so the only unknown left
//! after stabilization is the small loop-correction flow through the
//! stabilizer bridge. The builder mirrors the shape of a general AC
//! power-flow solver (tolerance, iteration ceiling) so CHA's solver
//! surface reads the same way the DHA power-flow driver's does.

use crate::sizing::{pressure_drop_bar_per_100m, SizedPipe, SizingParams};
use dh_core::{
    DhError, DhResult, HydraulicNetworkResult, JunctionResult, PipeHydraulicResult, PipeRole,
};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy)]
pub struct HydraulicSolverConfig {
    /// Convergence tolerance on the loop head-balance residual, in bar.
    pub tolerance_bar: f64,
    pub max_iterations: usize,
    pub supply_temp_c: f64,
    pub ambient_temp_c: f64,
}

impl Default for HydraulicSolverConfig {
    fn default() -> Self {
        Self {
            tolerance_bar: 1e-6,
            max_iterations: 50,
            supply_temp_c: 80.0,
            ambient_temp_c: 8.0,
        }
    }
}

/// Outcome of driving the stabilized network through the solver.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub result: HydraulicNetworkResult,
    pub stabilizer_flow_kg_s: f64,
    pub total_flow_kg_s: f64,
    pub iterations_used: usize,
}

/// Newton-Raphson hydraulic-thermal solver. Builder pattern: configure,
/// then call [`solve`](Self::solve).
pub struct NewtonRaphsonHydraulicSolver {
    config: HydraulicSolverConfig,
}

impl NewtonRaphsonHydraulicSolver {
    pub fn new() -> Self {
        Self { config: HydraulicSolverConfig::default() }
    }

    pub fn with_tolerance(mut self, tolerance_bar: f64) -> Self {
        self.config.tolerance_bar = tolerance_bar;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_supply_temp(mut self, supply_temp_c: f64) -> Self {
        self.config.supply_temp_c = supply_temp_c;
        self
    }

    pub fn with_ambient_temp(mut self, ambient_temp_c: f64) -> Self {
        self.config.ambient_temp_c = ambient_temp_c;
        self
    }

    /// Solve the stabilized network: `pipes` must include the stabilizer
    /// bridge (identified by `stabilizer_pipe_id`) and `loop_path_pipe_ids`
    /// the trunk pipes forming the other half of the one remaining cycle
    /// (the tree path between the two bridged nodes).
    pub fn solve(
        &self,
        pipes: &[SizedPipe],
        stabilizer_pipe_id: &str,
        loop_path_pipe_ids: &[String],
        sizing_params: &SizingParams,
    ) -> DhResult<SolveOutcome> {
        let stabilizer_idx = pipes
            .iter()
            .position(|p| p.pipe.id == stabilizer_pipe_id)
            .ok_or_else(|| DhError::SolverNonConvergence("stabilizer pipe not found".into()))?;

        let path_head_bar: f64 = loop_path_pipe_ids
            .iter()
            .filter_map(|id| pipes.iter().find(|p| &p.pipe.id == id))
            .map(|p| p.pressure_drop_bar_per_100m * (p.pipe.length_m / 100.0))
            .sum();

        let stab = &pipes[stabilizer_idx];
        let (stabilizer_flow, iterations, converged) = solve_stabilizer_flow(
            path_head_bar,
            stab.pipe.inner_diameter_m,
            stab.pipe.roughness_mm,
            stab.pipe.length_m,
            self.config.tolerance_bar,
            self.config.max_iterations,
            sizing_params,
        );

        if !converged {
            return Err(DhError::SolverNonConvergence(format!(
                "loop-flow Newton-Raphson did not converge within {} iterations",
                self.config.max_iterations
            )));
        }

        let total_flow_kg_s: f64 = pipes
            .iter()
            .filter(|p| p.pipe.role == PipeRole::TrunkSupply)
            .map(|p| p.mass_flow_kg_s)
            .fold(0.0_f64, f64::max);

        let mut final_pipes = pipes.to_vec();
        {
            let p = &mut final_pipes[stabilizer_idx];
            p.mass_flow_kg_s = stabilizer_flow;
            let area = std::f64::consts::PI * p.pipe.inner_diameter_m * p.pipe.inner_diameter_m / 4.0;
            p.velocity_ms = if area > 0.0 {
                stabilizer_flow / (sizing_params.water_density_kg_per_m3 * area)
            } else {
                0.0
            };
            p.pressure_drop_bar_per_100m = pressure_drop_bar_per_100m(
                p.velocity_ms,
                p.pipe.inner_diameter_m,
                p.pipe.roughness_mm,
                sizing_params,
            );
        }

        let result = build_network_result(&final_pipes, &self.config);

        Ok(SolveOutcome {
            result,
            stabilizer_flow_kg_s: stabilizer_flow,
            total_flow_kg_s,
            iterations_used: iterations,
        })
    }
}

impl Default for NewtonRaphsonHydraulicSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Solve `pressure_drop(x) * (length/100) == path_head_bar` for the
/// stabilizer flow `x` via a damped Newton-Raphson iteration on the scalar
/// residual, since head loss is monotone increasing in flow.
fn solve_stabilizer_flow(
    path_head_bar: f64,
    inner_diameter_m: f64,
    roughness_mm: f64,
    length_m: f64,
    tolerance_bar: f64,
    max_iterations: usize,
    params: &SizingParams,
) -> (f64, usize, bool) {
    let area = std::f64::consts::PI * inner_diameter_m * inner_diameter_m / 4.0;
    let head_at = |mdot: f64| -> f64 {
        let v = if area > 0.0 { mdot / (params.water_density_kg_per_m3 * area) } else { 0.0 };
        pressure_drop_bar_per_100m(v, inner_diameter_m, roughness_mm, params) * (length_m / 100.0)
    };

    if path_head_bar <= 0.0 {
        return (0.0, 0, true);
    }

    let mut x = 0.01_f64.max(1e-6);
    for iter in 0..max_iterations {
        let residual = head_at(x) - path_head_bar;
        if residual.abs() < tolerance_bar {
            return (x, iter, true);
        }
        let dx = (x * 1e-3).max(1e-9);
        let derivative = (head_at(x + dx) - head_at(x)) / dx;
        if derivative.abs() < 1e-12 {
            break;
        }
        let step = residual / derivative;
        x = (x - step).max(1e-9);
    }
    let residual = head_at(x) - path_head_bar;
    (x, max_iterations, residual.abs() < tolerance_bar * 10.0)
}

/// Compute per-pipe and per-junction results for the final flow state, with
/// temperature decaying along a BFS traversal rooted at any trunk-supply
/// pipe's `from_node` (taken as the plant junction).
fn build_network_result(pipes: &[SizedPipe], config: &HydraulicSolverConfig) -> HydraulicNetworkResult {
    let mut adjacency: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, p) in pipes.iter().enumerate() {
        adjacency.entry(p.pipe.from_node.clone()).or_default().push(i);
        adjacency.entry(p.pipe.to_node.clone()).or_default().push(i);
    }

    let root = pipes
        .iter()
        .find(|p| p.pipe.role == PipeRole::TrunkSupply)
        .map(|p| p.pipe.from_node.clone());

    let mut junction_temp: HashMap<String, f64> = HashMap::new();
    let mut junction_pressure: HashMap<String, f64> = HashMap::new();
    let mut pipe_results = Vec::with_capacity(pipes.len());
    let mut visited_nodes: HashSet<String> = HashSet::new();

    if let Some(root_id) = root {
        junction_temp.insert(root_id.clone(), config.supply_temp_c);
        junction_pressure.insert(root_id.clone(), 6.0);
        visited_nodes.insert(root_id.clone());
        let mut queue = VecDeque::new();
        queue.push_back(root_id);
        let mut visited_pipes = HashSet::new();

        while let Some(node) = queue.pop_front() {
            let t_from = *junction_temp.get(&node).unwrap_or(&config.supply_temp_c);
            let p_from = *junction_pressure.get(&node).unwrap_or(&6.0);
            let Some(edges) = adjacency.get(&node).cloned() else { continue };
            for pi in edges {
                if !visited_pipes.insert(pi) {
                    continue;
                }
                let p = &pipes[pi];
                let other = if p.pipe.from_node == node { p.pipe.to_node.clone() } else { p.pipe.from_node.clone() };

                let heat_loss_kw = p.pipe.u_w_per_m_k * p.pipe.length_m
                    * (t_from - config.ambient_temp_c)
                    / 1000.0;
                let t_to = (t_from - config.ambient_temp_c) * (-0.0002 * p.pipe.length_m).exp()
                    + config.ambient_temp_c;
                let head_loss = p.pressure_drop_bar_per_100m * (p.pipe.length_m / 100.0);
                let p_to = (p_from - head_loss).max(0.0);

                pipe_results.push(PipeHydraulicResult {
                    pipe_id: p.pipe.id.clone(),
                    velocity_ms: dh_core::units::MetersPerSecond(p.velocity_ms),
                    pressure_drop_bar: dh_core::units::Bar(head_loss),
                    pressure_drop_per_100m_bar: dh_core::units::BarPer100m(p.pressure_drop_bar_per_100m),
                    t_from_c: dh_core::units::Celsius(t_from),
                    t_to_c: dh_core::units::Celsius(t_to),
                    heat_loss_kw: dh_core::units::Kilowatts(heat_loss_kw),
                });

                if visited_nodes.insert(other.clone()) {
                    junction_temp.insert(other.clone(), t_to);
                    junction_pressure.insert(other.clone(), p_to);
                    queue.push_back(other);
                }
            }
        }
    }

    // Any pipe not reached by the BFS (shouldn't happen for a connected
    // network) still gets a result so downstream KPI extraction never
    // silently drops a pipe.
    let covered: HashSet<&str> = pipe_results.iter().map(|r| r.pipe_id.as_str()).collect();
    for p in pipes {
        if !covered.contains(p.pipe.id.as_str()) {
            pipe_results.push(PipeHydraulicResult {
                pipe_id: p.pipe.id.clone(),
                velocity_ms: dh_core::units::MetersPerSecond(p.velocity_ms),
                pressure_drop_bar: dh_core::units::Bar(p.pressure_drop_bar_per_100m * (p.pipe.length_m / 100.0)),
                pressure_drop_per_100m_bar: dh_core::units::BarPer100m(p.pressure_drop_bar_per_100m),
                t_from_c: dh_core::units::Celsius(config.supply_temp_c),
                t_to_c: dh_core::units::Celsius(config.supply_temp_c),
                heat_loss_kw: dh_core::units::Kilowatts(0.0),
            });
        }
    }

    let junctions = junction_temp
        .into_iter()
        .map(|(node_id, temperature_c)| JunctionResult {
            node_id: node_id.clone(),
            pressure_bar: dh_core::units::Bar(*junction_pressure.get(&node_id).unwrap_or(&0.0)),
            temperature_c: dh_core::units::Celsius(temperature_c),
        })
        .collect();

    HydraulicNetworkResult { converged: true, pipes: pipe_results, junctions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stabilizer::build_stabilizer_pipe;
    use dh_core::Pipe;
    use petgraph::graph::NodeIndex;

    fn trunk_pipe(id: &str, from: &str, to: &str, length_m: f64, mdot: f64) -> SizedPipe {
        let params = SizingParams::default();
        let dn = dh_catalogs::pipe_catalog::smallest_fitting(
            crate::sizing::required_diameter_m(mdot, &params),
        );
        let area = std::f64::consts::PI * dn.inner_diameter_m * dn.inner_diameter_m / 4.0;
        let v = mdot / (params.water_density_kg_per_m3 * area);
        let dp = pressure_drop_bar_per_100m(v, dn.inner_diameter_m, dn.roughness_mm, &params);
        SizedPipe {
            pipe: Pipe {
                id: id.into(),
                from_node: from.into(),
                to_node: to.into(),
                role: PipeRole::TrunkSupply,
                length_m,
                dn: dn.dn.to_string(),
                inner_diameter_m: dn.inner_diameter_m,
                roughness_mm: dn.roughness_mm,
                u_w_per_m_k: dn.u_w_per_m_k,
            },
            mass_flow_kg_s: mdot,
            velocity_ms: v,
            pressure_drop_bar_per_100m: dp,
            v_abs_max_exceeded: false,
            dp_per_m_exceeded: false,
        }
    }

    #[test]
    fn solves_small_loop_and_reports_pipe_results() {
        let params = SizingParams::default();
        let trunk = trunk_pipe("t0", "0", "1", 300.0, 8.0);
        let mut bridge = build_stabilizer_pipe((NodeIndex::new(0), NodeIndex::new(1)));
        bridge.pipe.from_node = "0".into();
        bridge.pipe.to_node = "1".into();

        let pipes = vec![trunk.clone(), bridge];
        let solver = NewtonRaphsonHydraulicSolver::new();
        let outcome = solver
            .solve(&pipes, "stabilizer-bridge", &["t0".to_string()], &params)
            .unwrap();

        assert!(outcome.result.converged);
        assert_eq!(outcome.result.pipes.len(), 2);
        assert!(outcome.stabilizer_flow_kg_s >= 0.0);
        assert!(outcome.stabilizer_flow_kg_s < outcome.total_flow_kg_s.max(trunk.mass_flow_kg_s));
    }

    #[test]
    fn zero_path_head_gives_zero_stabilizer_flow() {
        let (flow, iters, converged) = solve_stabilizer_flow(
            0.0, 0.0545, 100.0, 10.0, 1e-6, 50, &SizingParams::default(),
        );
        assert_eq!(flow, 0.0);
        assert_eq!(iters, 0);
        assert!(converged);
    }
}
