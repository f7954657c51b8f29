fn main() {
    capnpc::CompilerCommand::new()
        .src_prefix("schema")
        .file("schema/simulator.capnp")
        .run()
        .expect("compiling simulator schema");
}
