//! Motor functional test

use super::Fixture;
use crate::identity::UnitTemplate;
use crate::measurement::{Simulation, SimulationPlan};
use crate::models::{AbortPolicy, Limits, Sequence, SequenceError, StepDefinition};

pub fn motor() -> Result<Fixture, SequenceError> {
    let sequence = Sequence::builder("motor")
        .step(StepDefinition::boolean("visual_inspection_connector", 8))
        .step(StepDefinition::boolean("power_on_test", 1))
        .step(StepDefinition::numeric("power_supply_check_voltage", "V", Limits::range(11.5, 12.5), 3))
        .step(StepDefinition::numeric("power_supply_check_current", "A", Limits::at_most(1.5), 3))
        .step(StepDefinition::boolean("motor_startup_test", 15))
        .step(StepDefinition::numeric("motor_startup_rpm", "RPM", Limits::at_least(100.0), 20))
        .step(StepDefinition::boolean("speed_consistency_no_load_test", 10))
        .step(StepDefinition::numeric("encoder_feedback_measurement", "% deviation", Limits::range(0.0, 5.0), 4))
        .step(StepDefinition::numeric("backlash_response_time_test", "seconds", Limits::at_most(0.2), 6))
        .step(StepDefinition::numeric("full_speed_braking_test", "seconds", Limits::at_most(2.0), 12))
        .step(StepDefinition::numeric("thermal_reading", "°C", Limits::at_most(80.0), 10))
        .step(StepDefinition::numeric("motor_noise", "dB", Limits::at_most(50.0), 18))
        .step(StepDefinition::boolean("encoder_feedback_test", 4))
        .step(StepDefinition::numeric("final_rpm_reading", "RPM", Limits::range(2900.0, 3100.0), 15))
        .policy(AbortPolicy::AbortOnFirstFailure)
        .build()?;

    let plan = SimulationPlan::new()
        .step("visual_inspection_connector", Simulation::flag(1.0))
        .attach("visual_inspection_connector", "assets/motor_connector.png")
        .step("power_on_test", Simulation::flag(1.0))
        .step("power_supply_check_voltage", Simulation::number(0.99, (11.5, 12.5), (10.0, 11.0), 1))
        .step("power_supply_check_current", Simulation::number(0.99, (0.0, 1.5), (1.6, 2.0), 2))
        .step("motor_startup_test", Simulation::flag(0.99))
        .step("motor_startup_rpm", Simulation::number(0.99, (100.0, 1500.0), (50.0, 99.0), 0))
        .step("speed_consistency_no_load_test", Simulation::flag(0.98))
        .step("encoder_feedback_measurement", Simulation::number(0.99, (0.5, 4.9), (5.1, 10.0), 1))
        .step("backlash_response_time_test", Simulation::number(0.95, (0.0, 0.19), (0.21, 0.5), 3))
        .step("full_speed_braking_test", Simulation::number(0.8, (1.5, 2.0), (2.1, 3.0), 2))
        .step("thermal_reading", Simulation::number(0.75, (75.0, 80.0), (81.0, 100.0), 1))
        .step("motor_noise", Simulation::number(0.92, (45.0, 50.0), (51.0, 55.0), 0))
        .step("encoder_feedback_test", Simulation::flag(0.99))
        .step("final_rpm_reading", Simulation::number(1.0, (2900.0, 3100.0), (2500.0, 2899.0), 0));

    Ok(Fixture::new(
        "motor",
        "Motor functional test with connector inspection",
        "FVT1",
        UnitTemplate::new("00109", "A").batch("1024"),
        sequence,
        plan,
    )
    .report_variable("motor_serial_number", "{serial_number}")
    .report_variable("production_date", "{date}")
    .report_variable("report_date", "{date}"))
}
