pub mod scenario_reader;
