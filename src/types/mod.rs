pub mod city;
pub mod department;
pub mod station;
