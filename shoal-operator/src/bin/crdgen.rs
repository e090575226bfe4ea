use kube::core::CustomResourceExt;
use shoal_operator::crd::object_gateway::ObjectGateway;
use shoal_operator::crd::quickstart::QuickStart;
use shoal_operator::crd::reef_cluster::ReefCluster;
use shoal_operator::crd::storage_cluster::StorageCluster;

fn main() {
    let crds = [
        StorageCluster::crd(),
        ReefCluster::crd(),
        ObjectGateway::crd(),
        QuickStart::crd(),
    ];
    for crd in crds {
        let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
        println!("---");
        println!("{}", yaml);
    }
}
