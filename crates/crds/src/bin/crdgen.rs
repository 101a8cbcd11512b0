//! Emits the CRD manifests for all cluster provisioning resources as a
//! multi-document YAML stream on stdout, for `kubectl apply -f -`.

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::Machine::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&crds::Cluster::crd())?);
    Ok(())
}
