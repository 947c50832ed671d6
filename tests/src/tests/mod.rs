mod it_lepton_live;
mod it_transformation_lifecycle;
