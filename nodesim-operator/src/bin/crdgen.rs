use kube::core::CustomResourceExt;
use nodesim_operator::crd::node_simulator::NodeSimulator;

fn main() {
    let crd = NodeSimulator::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
