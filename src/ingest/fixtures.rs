/// Test fixtures: representative meter uploads and weather archive members.
///
/// Feed fixtures are structurally complete Green Button documents trimmed to
/// the entries the parser cares about. Real utility feeds look like:
///
///   feed (Atom)
///     entry  link rel="self" .../UsagePoint/<id>          title = site name
///     entry  link rel="self" .../LocalTimeParameters/<id> tzOffset (seconds)
///     entry  link rel="self" .../MeterReading/<id>
///     entry  link rel="self" .../ReadingType/<id>
///     entry  link rel="self" .../IntervalBlock/<id>       IntervalReading*
///     entry  link rel="self" .../ElectricPowerUsageSummary/<id>
///
/// Each IntervalReading carries `timePeriod/start` (epoch seconds) and
/// `value` (watts, integer).

use std::io::{Cursor, Write};

/// One site, offset -7h, one reading of 703 W at epoch 1293840000
/// (2011-01-01T00:00:00Z).
#[cfg(test)]
pub(crate) fn fixture_single_reading_feed() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:espi="http://naesb.org/espi">
  <id>urn:uuid:0071C5A7-91CF-434E-8BCE-C38AC8AF215D</id>
  <title>Green Button Usage Feed</title>
  <updated>2012-10-24T00:00:00Z</updated>
  <entry>
    <id>urn:uuid:97EAEBAD-1214-4A58-A3D4-A16A6DE718E1</id>
    <link href="RetailCustomer/9B6C7066/UsagePoint" rel="up"/>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1" rel="self"/>
    <title>Front Electric Meter</title>
    <content>
      <UsagePoint xmlns="http://naesb.org/espi">
        <ServiceCategory><kind>0</kind></ServiceCategory>
      </UsagePoint>
    </content>
    <published>2012-10-24T00:00:00Z</published>
    <updated>2012-10-24T00:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:uuid:FA3A4EEF-F4D8-4B4A-8FD1-10AA6E3B8E4C</id>
    <link href="LocalTimeParameters/01" rel="self"/>
    <title>DST For North America</title>
    <content>
      <LocalTimeParameters xmlns="http://naesb.org/espi">
        <dstEndRule>B40E2000</dstEndRule>
        <dstOffset>3600</dstOffset>
        <dstStartRule>360E2000</dstStartRule>
        <tzOffset>-25200</tzOffset>
      </LocalTimeParameters>
    </content>
  </entry>
  <entry>
    <id>urn:uuid:3D3A1F60-0E4B-4D8E-8B2B-0E1E3B5F7A10</id>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1/MeterReading/01" rel="self"/>
    <title>Hourly Electricity Consumption</title>
    <content>
      <MeterReading xmlns="http://naesb.org/espi"/>
    </content>
    <published>2012-10-24T00:00:00Z</published>
    <updated>2012-10-24T00:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:uuid:82B3E74B-DFC0-4DD4-8651-91A67B40374D</id>
    <link href="ReadingType/07" rel="self"/>
    <title>Energy Delivered (kWh)</title>
    <content>
      <ReadingType xmlns="http://naesb.org/espi">
        <accumulationBehaviour>4</accumulationBehaviour>
        <commodity>1</commodity>
        <flowDirection>1</flowDirection>
        <uom>72</uom>
      </ReadingType>
    </content>
  </entry>
  <entry>
    <id>urn:uuid:FE317A0A-F7F5-4307-B158-28A34F4B0DA2</id>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1/MeterReading/01/IntervalBlock/173" rel="self"/>
    <title/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading>
          <cost>3454000</cost>
          <timePeriod>
            <duration>3600</duration>
            <start>1293840000</start>
          </timePeriod>
          <value>703</value>
        </IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
</feed>"#
}

/// Two sites. "Main House" splits one reading block across two IntervalBlocks
/// with an ElectricPowerUsageSummary between them. "Garage" has no self
/// links at all, so its entry types come from the content payload, and its
/// IntervalBlock arrives without a MeterReading.
#[cfg(test)]
pub(crate) fn fixture_multi_site_feed() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Two Site Export</title>
  <entry>
    <link href="RetailCustomer/1/UsagePoint/1" rel="self"/>
    <title>Main House</title>
    <content><UsagePoint xmlns="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <link href="RetailCustomer/1/UsagePoint/1/MeterReading/01" rel="self"/>
    <content><MeterReading xmlns="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <link href="RetailCustomer/1/UsagePoint/1/MeterReading/01/IntervalBlock/1" rel="self"/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading><timePeriod><duration>3600</duration><start>1357027200</start></timePeriod><value>500</value></IntervalReading>
        <IntervalReading><timePeriod><duration>3600</duration><start>1357030800</start></timePeriod><value>510</value></IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
  <entry>
    <link href="RetailCustomer/1/UsagePoint/1/ElectricPowerUsageSummary/1" rel="self"/>
    <content>
      <ElectricPowerUsageSummary xmlns="http://naesb.org/espi">
        <billingPeriod><duration>2592000</duration><start>1357027200</start></billingPeriod>
      </ElectricPowerUsageSummary>
    </content>
  </entry>
  <entry>
    <link href="RetailCustomer/1/UsagePoint/1/MeterReading/01/IntervalBlock/2" rel="self"/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading><timePeriod><duration>3600</duration><start>1357034400</start></timePeriod><value>520</value></IntervalReading>
        <IntervalReading><timePeriod><duration>3600</duration><start>1357038000</start></timePeriod><value>530</value></IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
  <entry>
    <title>Garage</title>
    <content><espi:UsagePoint xmlns:espi="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <content>
      <espi:IntervalBlock xmlns:espi="http://naesb.org/espi">
        <espi:IntervalReading>
          <espi:timePeriod><espi:duration>3600</espi:duration><espi:start>1357027200</espi:start></espi:timePeriod>
          <espi:value>42</espi:value>
        </espi:IntervalReading>
      </espi:IntervalBlock>
    </content>
  </entry>
</feed>"#
}

/// One site with two MeterReadings, each followed by its own IntervalBlock.
#[cfg(test)]
pub(crate) fn fixture_two_meter_readings_feed() -> &'static str {
    r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <link href="UsagePoint/1" rel="self"/>
    <title>Duplex</title>
  </entry>
  <entry><link href="UsagePoint/1/MeterReading/01" rel="self"/></entry>
  <entry>
    <link href="UsagePoint/1/MeterReading/01/IntervalBlock/1" rel="self"/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading><timePeriod><start>1357027200</start></timePeriod><value>8</value></IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
  <entry><link href="UsagePoint/1/MeterReading/02" rel="self"/></entry>
  <entry>
    <link href="UsagePoint/1/MeterReading/02/IntervalBlock/1" rel="self"/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading><timePeriod><start>1357027200</start></timePeriod><value>9</value></IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
</feed>"#
}

/// Classic entity expansion bomb.
#[cfg(test)]
pub(crate) fn fixture_billion_laughs() -> &'static str {
    r#"<?xml version="1.0"?>
<!DOCTYPE lolz [
  <!ENTITY lol "lol">
  <!ENTITY lol2 "&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;">
  <!ENTITY lol3 "&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;">
  <!ENTITY lol4 "&lol3;&lol3;&lol3;&lol3;&lol3;&lol3;&lol3;&lol3;&lol3;&lol3;">
]>
<feed xmlns="http://www.w3.org/2005/Atom"><title>&lol4;</title></feed>"#
}

/// External entity pointing at a local file.
#[cfg(test)]
pub(crate) fn fixture_external_entity() -> &'static str {
    r#"<?xml version="1.0"?>
<!DOCTYPE feed [
  <!ENTITY secret SYSTEM "file:///etc/passwd">
]>
<feed xmlns="http://www.w3.org/2005/Atom"><title>&secret;</title></feed>"#
}

/// One site whose first MeterReading has no IntervalBlocks; the readings
/// belong to the second one.
#[cfg(test)]
pub(crate) fn fixture_leading_empty_meter_reading_feed() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Green Button Usage Feed</title>
  <entry>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1" rel="self"/>
    <title>Front Electric Meter</title>
    <content><UsagePoint xmlns="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1/MeterReading/01" rel="self"/>
    <content><MeterReading xmlns="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1/MeterReading/02" rel="self"/>
    <content><MeterReading xmlns="http://naesb.org/espi"/></content>
  </entry>
  <entry>
    <link href="RetailCustomer/9B6C7066/UsagePoint/1/MeterReading/02/IntervalBlock/173" rel="self"/>
    <content>
      <IntervalBlock xmlns="http://naesb.org/espi">
        <IntervalReading>
          <timePeriod><duration>3600</duration><start>1293840000</start></timePeriod>
          <value>703</value>
        </IntervalReading>
      </IntervalBlock>
    </content>
  </entry>
</feed>"#
}

/// Hourly delimited export spanning midnight.
#[cfg(test)]
pub(crate) fn fixture_delimited_export() -> &'static str {
    "date,reading\n\
     2011-10-29 22:00,410\n\
     2011-10-29 23:00,380\n\
     2011-10-30 00:00,327\n\
     2011-10-30 01:00,267\n"
}

/// QCLCD station roster member (pipe-delimited), three stations around
/// Palo Alto. The last row has an unparseable latitude.
#[cfg(test)]
pub(crate) fn fixture_station_roster() -> &'static str {
    "WBAN|WMO|CallSign|ClimateDivisionCode|ClimateDivisionStateCode|ClimateDivisionStationCode|Name|State|Location|Latitude|Longitude|GroundHeight|StationHeight|Barometer|TimeZone\n\
     23293|72494|SJC|05|04|7821|SAN JOSE|CA|SAN JOSE INTERNATIONAL AIRPORT|37.359|-121.924|49|50|58|-8\n\
     23244|74509|NUQ|05|04|6053|MOUNTAIN VIEW|CA|MOFFETT FEDERAL AIRFIELD|37.406|-122.048|10|11|12|-8\n\
     93231|72493|PAO|05|04|6646|PALO ALTO|CA|PALO ALTO AIRPORT|37.461|-122.115|2|3|4|-8\n\
     99999||XXX|||||CA|NOWHERE|north|-122.0||||-8\n"
}

/// QCLCD daily observations member (comma-delimited). PAO only reports on
/// the 2nd; SJC reports the 1st through 3rd, with a missing average on the 3rd.
#[cfg(test)]
pub(crate) fn fixture_daily_observations() -> &'static str {
    "WBAN,YearMonthDay,Tmax,TmaxFlag,Tmin,TminFlag,Tavg,TavgFlag\n\
     93231,20130302,61, ,44, ,53, \n\
     23293,20130301,60, ,40, ,50, \n\
     23293,20130302,62, ,42, ,52, \n\
     23293,20130303,64, ,44,  ,M, \n"
}

/// Builds an in-memory ZIP archive from `(name, contents)` pairs.
#[cfg(test)]
pub(crate) fn zip_archive(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
