fn main() -> anyhow::Result<()> {
    llm_pulse_lib::run()
}
