//! Climatic chamber final assembly test

use super::Fixture;
use crate::identity::UnitTemplate;
use crate::measurement::{Simulation, SimulationPlan};
use crate::models::{AbortPolicy, Limits, Sequence, SequenceError, StepDefinition};

pub fn climatic_chamber() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("climatic-chamber")
        .step(StepDefinition::boolean("power_on_test", 1))
        .step(StepDefinition::numeric("initial_temp_reading", "°C", Limits::range(20.0, 25.0), 2))
        .step(StepDefinition::boolean("heat_up_start_test", 1))
        .step(StepDefinition::numeric("temp_rise_rate_test", "°C/min", Limits::at_least(5.0), 3))
        .step(StepDefinition::boolean("target_temp_reached_test", 2))
        .step(StepDefinition::numeric("stable_temp_test", "°C", Limits::range(-1.0, 1.0), 10))
        .step(StepDefinition::numeric("energy_consumption_test", "kWh", Limits::at_most(5.0), 5))
        .step(StepDefinition::boolean("cooling_system_activation_test", 1))
        .step(StepDefinition::numeric("cool_down_rate_test", "°C/min", Limits::at_most(4.0), 3))
        .step(StepDefinition::numeric("fan_speed_test", "RPM", Limits::range(1000.0, 1500.0), 2))
        .step(StepDefinition::boolean("overheating_protection_test", 2))
        .step(StepDefinition::numeric("noise_level_test", "dB", Limits::at_most(60.0), 2))
        .step(StepDefinition::boolean("cycle_completion_signal_test", 1))
        .step(StepDefinition::numeric("final_temp_reading", "°C", Limits::range(20.0, 25.0), 2))
        .step(StepDefinition::numeric("operational_efficiency_test", "%", Limits::at_least(90.0), 3))
        .policy(AbortPolicy::RunAll)
        .build()?;

    let plan = SimulationPlan::new()
        .step("power_on_test", Simulation::flag(1.0))
        .step("initial_temp_reading", Simulation::number(1.0, (20.0, 25.0), (15.0, 19.0), 1))
        .step("heat_up_start_test", Simulation::flag(1.0))
        .step("temp_rise_rate_test", Simulation::number(0.74, (5.0, 7.0), (3.0, 4.9), 2))
        .step("target_temp_reached_test", Simulation::flag(1.0))
        .step("stable_temp_test", Simulation::number(1.0, (-1.0, 1.0), (1.1, 2.5), 2))
        .step("energy_consumption_test", Simulation::number(0.9, (3.0, 5.0), (5.1, 6.0), 2))
        .step("cooling_system_activation_test", Simulation::flag(1.0))
        .step("cool_down_rate_test", Simulation::number(1.0, (3.0, 4.0), (4.5, 5.0), 2))
        .step("fan_speed_test", Simulation::number(1.0, (1000.0, 1500.0), (800.0, 999.0), 0))
        .step("overheating_protection_test", Simulation::flag(0.98))
        .step("noise_level_test", Simulation::number(0.99, (55.0, 60.0), (60.1, 70.0), 1))
        .step("cycle_completion_signal_test", Simulation::flag(0.99))
        .step("final_temp_reading", Simulation::number(1.0, (20.0, 25.0), (25.1, 30.0), 1))
        .step("operational_efficiency_test", Simulation::number(1.0, (90.0, 95.0), (85.0, 89.0), 1));

    Ok(Fixture::new(
        "climatic-chamber",
        "Climatic chamber heat-up, stability and cool-down cycle",
        "FVT1",
        UnitTemplate::new("UNIT42", "1.0"),
        sequence,
        plan,
    ))
}
