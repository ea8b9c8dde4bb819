mod csv_load;
mod support;
